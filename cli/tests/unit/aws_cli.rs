//! Tests for `AwsCli`: argument construction and response/stderr mapping.

use std::path::Path;

use trainstack_cli::application::ports::{ObjectStore, StackBackend, TrainingService};
use trainstack_cli::domain::{
    CreateOutcome, ProvisionError, S3Uri, StackStatus, TrainingJobStatus,
};
use trainstack_cli::infra::aws::{AwsCli, parse_stack_description};
use trainstack_cli::infra::command_runner::UPLOAD_TIMEOUT;

use crate::helpers::{MockCommandRunner, err_output, ok_output};

fn cli(runner: MockCommandRunner) -> AwsCli<MockCommandRunner> {
    AwsCli::new(runner, Some("us-west-2".to_string()), None)
}

fn args_of(runner: &MockCommandRunner, call: usize) -> Vec<String> {
    let calls = runner.calls();
    assert_eq!(calls[call].0, "aws");
    calls[call].1.clone()
}

const DESCRIBE_COMPLETE: &str = r#"{
  "Stacks": [{
    "StackName": "hvd-vpc",
    "StackStatus": "CREATE_COMPLETE",
    "Outputs": [
      {"OutputKey": "Subnet1Id", "OutputValue": "subnet-aaa"},
      {"OutputKey": "SecurityGroupId", "OutputValue": "sg-111", "Description": "training"},
      {"OutputKey": "Subnet2Id", "OutputValue": "subnet-bbb"}
    ]
  }]
}"#;

#[tokio::test]
async fn create_stack_passes_name_template_and_globals() {
    let runner = MockCommandRunner::with_outputs([ok_output(
        br#"{"StackId": "arn:aws:cloudformation:us-west-2:1:stack/hvd-vpc/abc"}"#,
    )]);
    let aws = cli(runner.clone());

    let outcome = aws.create_stack("hvd-vpc", "Resources: {}").await.expect("created");

    assert_eq!(
        outcome,
        CreateOutcome::Created {
            stack_id: "arn:aws:cloudformation:us-west-2:1:stack/hvd-vpc/abc".to_string()
        }
    );
    assert_eq!(
        args_of(&runner, 0),
        vec![
            "cloudformation",
            "create-stack",
            "--stack-name",
            "hvd-vpc",
            "--template-body",
            "Resources: {}",
            "--output",
            "json",
            "--region",
            "us-west-2",
        ]
    );
}

#[tokio::test]
async fn profile_is_appended_when_configured() {
    let runner = MockCommandRunner::with_outputs([ok_output(b"")]);
    let aws = AwsCli::new(runner.clone(), None, Some("research".to_string()));

    aws.delete_stack("hvd-vpc").await.expect("deleted");

    let args = args_of(&runner, 0);
    assert!(!args.contains(&"--region".to_string()), "got: {args:?}");
    assert_eq!(args[args.len() - 2..], ["--profile", "research"]);
}

#[tokio::test]
async fn already_exists_exception_maps_to_outcome() {
    let runner = MockCommandRunner::with_outputs([err_output(
        254,
        b"An error occurred (AlreadyExistsException) when calling the CreateStack operation: Stack [hvd-vpc] already exists",
    )]);

    let outcome = cli(runner).create_stack("hvd-vpc", "{}").await.expect("not an error");

    assert_eq!(outcome, CreateOutcome::AlreadyExists);
}

#[tokio::test]
async fn other_create_failures_carry_stderr() {
    let runner = MockCommandRunner::with_outputs([err_output(
        254,
        b"An error occurred (ValidationError) when calling the CreateStack operation: Template format error",
    )]);

    let err = cli(runner)
        .create_stack("hvd-vpc", "not yaml")
        .await
        .expect_err("validation error");

    assert!(err.to_string().contains("Template format error"), "got: {err}");
}

#[tokio::test]
async fn describe_stack_parses_status_and_outputs_in_order() {
    let runner = MockCommandRunner::with_outputs([ok_output(DESCRIBE_COMPLETE.as_bytes())]);

    let d = cli(runner.clone()).describe_stack("hvd-vpc").await.expect("described");

    assert_eq!(d.status, StackStatus::CreateComplete);
    let keys: Vec<&str> = d.outputs.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, ["Subnet1Id", "SecurityGroupId", "Subnet2Id"]);
    assert_eq!(
        args_of(&runner, 0)[..4],
        ["cloudformation", "describe-stacks", "--stack-name", "hvd-vpc"]
    );
}

#[tokio::test]
async fn describe_missing_stack_is_not_found() {
    let runner = MockCommandRunner::with_outputs([err_output(
        254,
        b"An error occurred (ValidationError) when calling the DescribeStacks operation: Stack with id hvd-vpc does not exist",
    )]);

    let err = cli(runner).describe_stack("hvd-vpc").await.expect_err("missing");

    assert!(matches!(
        err.downcast_ref::<ProvisionError>(),
        Some(ProvisionError::NotFound { .. })
    ));
}

#[test]
fn parse_keeps_unknown_status_and_reason() {
    let json = br#"{"Stacks":[{"StackName":"hvd-vpc","StackStatus":"UPDATE_ROLLBACK_FAILED","StackStatusReason":"boom"}]}"#;
    let d = parse_stack_description("hvd-vpc", json).expect("parsed");
    assert_eq!(d.status.as_str(), "UPDATE_ROLLBACK_FAILED");
    assert_eq!(d.status_reason.as_deref(), Some("boom"));
    assert!(d.outputs.is_empty());
}

#[test]
fn parse_rejects_malformed_json() {
    assert!(parse_stack_description("hvd-vpc", b"not json").is_err());
}

#[tokio::test]
async fn uploads_use_the_long_timeout() {
    let runner = MockCommandRunner::with_outputs([ok_output(b""), ok_output(b"")]);
    let aws = cli(runner.clone());
    let dest = S3Uri::new("bucket", "horovod-mnist/data");

    aws.upload_dir(Path::new("data"), &dest).await.expect("uploaded dir");
    aws.upload_file(Path::new("sourcedir.tar.gz"), &dest.join("sourcedir.tar.gz"))
        .await
        .expect("uploaded file");

    assert_eq!(runner.timeouts(), vec![Some(UPLOAD_TIMEOUT); 2]);
    assert_eq!(
        args_of(&runner, 0)[..5],
        ["s3", "cp", "--recursive", "data", "s3://bucket/horovod-mnist/data"]
    );
    assert_eq!(
        args_of(&runner, 1)[..4],
        [
            "s3",
            "cp",
            "sourcedir.tar.gz",
            "s3://bucket/horovod-mnist/data/sourcedir.tar.gz"
        ]
    );
}

#[tokio::test]
async fn describe_training_job_parses_status() {
    let runner = MockCommandRunner::with_outputs([ok_output(
        br#"{"TrainingJobName":"hvd-1","TrainingJobStatus":"Failed","SecondaryStatus":"Failed","FailureReason":"AlgorithmError: exit 1"}"#,
    )]);

    let d = cli(runner).describe_training_job("hvd-1").await.expect("described");

    assert_eq!(d.status, TrainingJobStatus::Failed);
    assert_eq!(d.failure_reason.as_deref(), Some("AlgorithmError: exit 1"));
}

#[tokio::test]
async fn create_training_job_sends_request_as_cli_input_json() {
    let runner = MockCommandRunner::with_outputs([ok_output(
        br#"{"TrainingJobArn":"arn:aws:sagemaker:us-west-2:1:training-job/hvd-1"}"#,
    )]);
    let request = crate::training_service::spec().to_request();

    let arn = cli(runner.clone())
        .create_training_job(&request)
        .await
        .expect("submitted");

    assert_eq!(arn, "arn:aws:sagemaker:us-west-2:1:training-job/hvd-1");
    let args = args_of(&runner, 0);
    assert_eq!(args[..3], ["sagemaker", "create-training-job", "--cli-input-json"]);
    let body: serde_json::Value = serde_json::from_str(&args[3]).expect("json body");
    assert_eq!(body["TrainingJobName"], "hvd-1");
}
