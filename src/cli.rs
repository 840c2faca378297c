/// CLI argument parsing and command execution.
use clap::Parser;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use triton_loadgen::error::AppError;
use triton_loadgen::http::{fetch_schema, ClientConfig, TritonClient};
use triton_loadgen::output::{write_completions, OutputFormat};
use triton_loadgen::payload::build_request;
use triton_loadgen::simulator::{DriverConfig, FailurePolicy, LoadDriver};
use triton_loadgen::telemetry;

/// triton-loadgen - Fixed-rate load generator for Triton inference servers.
#[derive(Parser, Debug)]
#[command(name = "triton-loadgen")]
#[command(about = "Send zero-filled inference requests to a Triton model at a fixed rate")]
#[command(
    long_about = r#"triton-loadgen - Fixed-rate load generator for KServe v2 / Triton inference servers

Fetches the model config once from /v2/models/MODEL/config, then POSTs a
zero-filled request to /v2/models/MODEL/infer every 1/RATE seconds without
waiting for earlier requests to finish.

Each successful request prints one line to stdout:

  <unix-seconds-of-tick> <latency-seconds>

Latency runs from the tick's scheduled time to the arrival of the response.
Time a completion spends queued behind slow output is not counted.

Logs go to stderr (filter with RUST_LOG). Stop with Ctrl+C.

EXAMPLES:
  # 50 requests per second against a local server
  triton-loadgen simple 50

  # Remote server, keep going through 5xx responses, stop after a minute
  triton-loadgen -a triton.internal:8000 --on-status-error drop --duration 60 resnet50 20

  # Show the request that would be sent
  triton-loadgen --dry-run simple 1"#
)]
#[command(version)]
pub struct Cli {
    /// Model name as served by the inference server
    #[arg(value_name = "MODEL")]
    pub model: String,

    /// Target rate in requests per second
    #[arg(value_name = "RATE", allow_negative_numbers = true)]
    pub rate: f64,

    /// Inference server authority (host:port)
    #[arg(short, long, default_value = "localhost:8000")]
    pub authority: String,

    /// Maximum requests in flight; ticks beyond this are skipped
    #[arg(long, default_value_t = DriverConfig::DEFAULT_MAX_IN_FLIGHT)]
    pub max_in_flight: usize,

    /// Completions buffered before requests wait on the output
    #[arg(long, default_value_t = DriverConfig::DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// What to do when a request gets no response
    #[arg(long, value_enum, default_value = "drop")]
    pub on_transport_error: FailurePolicy,

    /// What to do when the server answers with a non-200 status
    #[arg(long, value_enum, default_value = "abort")]
    pub on_status_error: FailurePolicy,

    /// Retries per request for the `retry` policy
    #[arg(long, default_value_t = DriverConfig::DEFAULT_RETRIES)]
    pub retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 60.0)]
    pub timeout: f64,

    /// Stop after this many seconds instead of running until interrupted
    #[arg(long, value_name = "SECS")]
    pub duration: Option<f64>,

    /// Output format for completion records
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Fetch the schema, print the synthesized request and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Execute the CLI command.
    pub fn run(self) -> Result<(), AppError> {
        telemetry::init_tracing(self.log_json);

        let client_config = self.client_config()?;
        let driver_config = self.driver_config()?;

        let rt = tokio::runtime::Runtime::new()?;

        let mut stdout = io::stdout();
        rt.block_on(self.execute(client_config, driver_config, &mut stdout))
    }

    async fn execute<W: Write>(
        &self,
        client_config: ClientConfig,
        driver_config: DriverConfig,
        out: &mut W,
    ) -> Result<(), AppError> {
        let client = Arc::new(TritonClient::new(client_config)?);
        let schema = fetch_schema(client.as_ref(), &driver_config.model).await?;

        if self.dry_run {
            let request = build_request(&schema)?;
            writeln!(out, "{}", serde_json::to_string_pretty(&request)?)?;
            return Ok(());
        }

        let (stream, handle) = LoadDriver::new(client, schema, driver_config).start()?;

        let token = handle.cancellation_token();
        tokio::spawn(async move {
            telemetry::shutdown_signal().await;
            token.cancel();
        });

        let formatter = self.format.formatter();
        let written = match write_completions(stream, formatter.as_ref(), out).await {
            Ok(written) => written,
            Err(e) => {
                handle.cancel();
                if let Err(driver_err) = handle.wait().await {
                    tracing::error!(error = %driver_err, "load driver failed after output error");
                }
                return Err(e);
            }
        };

        let summary = handle.wait().await?;
        tracing::info!(
            written,
            ticks = summary.ticks,
            dropped = summary.dropped,
            skipped = summary.skipped,
            "run finished"
        );
        Ok(())
    }

    fn client_config(&self) -> Result<ClientConfig, AppError> {
        Ok(ClientConfig {
            authority: self.authority.clone(),
            timeout: seconds("--timeout", self.timeout)?,
            headers: Vec::new(),
        })
    }

    fn driver_config(&self) -> Result<DriverConfig, AppError> {
        let mut config = DriverConfig::new(self.model.clone(), self.rate);
        config.max_in_flight = self.max_in_flight;
        config.queue_capacity = self.queue_capacity;
        config.transport_error = self.on_transport_error;
        config.status_error = self.on_status_error;
        config.retries = self.retries;
        config.duration = self
            .duration
            .map(|secs| seconds("--duration", secs))
            .transpose()?;

        config.validate()?;
        Ok(config)
    }
}

/// Process exit code for a failed run: 2 for invalid arguments, 1 otherwise.
pub fn exit_code(err: &AppError) -> i32 {
    match err {
        AppError::Config(_) => 2,
        _ => 1,
    }
}

/// Positive seconds, at most `DriverConfig::MAX_SPAN`, as a `Duration`.
fn seconds(flag: &str, value: f64) -> Result<Duration, AppError> {
    if value.is_nan() || value <= 0.0 {
        return Err(AppError::Config(format!(
            "{} must be a positive number of seconds, got {}",
            flag, value
        )));
    }
    match Duration::try_from_secs_f64(value) {
        Ok(duration) if duration <= DriverConfig::MAX_SPAN => Ok(duration),
        _ => Err(AppError::Config(format!(
            "{} must be at most {} seconds, got {}",
            flag,
            DriverConfig::MAX_SPAN.as_secs(),
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use httpmock::prelude::*;
    use serde_json::json;

    async fn mock_config(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/models/simple/config");
                then.status(200).json_body(json!({
                    "max_batch_size": 4,
                    "input": [
                        {"name": "INPUT0", "data_type": "TYPE_FP32", "dims": [3]},
                        {"name": "MASK", "data_type": "TYPE_BOOL", "dims": [2], "optional": true}
                    ]
                }));
            })
            .await;
    }

    async fn execute(cli: &Cli, out: &mut Vec<u8>) -> Result<(), AppError> {
        let client_config = cli.client_config()?;
        let driver_config = cli.driver_config()?;
        cli.execute(client_config, driver_config, out).await
    }

    #[test]
    fn parse_positional_arguments_with_defaults() {
        let cli = Cli::try_parse_from(["triton-loadgen", "simple", "12.5"])
            .expect("CLI args should parse");

        assert_eq!(cli.model, "simple");
        assert_eq!(cli.rate, 12.5);
        assert_eq!(cli.authority, "localhost:8000");
        assert_eq!(cli.max_in_flight, 1024);
        assert_eq!(cli.queue_capacity, 10);
        assert_eq!(cli.on_transport_error, FailurePolicy::Drop);
        assert_eq!(cli.on_status_error, FailurePolicy::Abort);
        assert_eq!(cli.retries, 3);
        assert!(cli.duration.is_none());
        assert!(!cli.dry_run);
        assert_eq!(cli.format, OutputFormat::Text);

        let config = cli.driver_config().expect("valid config");
        assert_eq!(config.tick_interval().unwrap(), Duration::from_millis(80));
        let client = cli.client_config().expect("valid client config");
        assert_eq!(client.timeout, Duration::from_secs(60));
    }

    #[test]
    fn parse_overrides() {
        let cli = Cli::try_parse_from([
            "triton-loadgen",
            "-a",
            "triton.internal:9000",
            "--max-in-flight",
            "64",
            "--queue-capacity",
            "100",
            "--on-transport-error",
            "retry",
            "--on-status-error",
            "drop",
            "--retries",
            "5",
            "--timeout",
            "2.5",
            "--duration",
            "30",
            "--format",
            "csv",
            "--log-json",
            "resnet50",
            "100",
        ])
        .expect("CLI args should parse with overrides");

        assert_eq!(cli.authority, "triton.internal:9000");
        assert!(cli.log_json);

        let config = cli.driver_config().expect("valid config");
        assert_eq!(config.model, "resnet50");
        assert_eq!(config.max_in_flight, 64);
        assert_eq!(config.queue_capacity, 100);
        assert_eq!(config.transport_error, FailurePolicy::Retry);
        assert_eq!(config.status_error, FailurePolicy::Drop);
        assert_eq!(config.retries, 5);
        assert_eq!(config.duration, Some(Duration::from_secs(30)));
        assert_eq!(cli.format, OutputFormat::Csv);

        let client = cli.client_config().expect("valid client config");
        assert_eq!(client.timeout, Duration::from_millis(2500));
        assert_eq!(
            client.infer_url("resnet50"),
            "http://triton.internal:9000/v2/models/resnet50/infer"
        );
    }

    #[test]
    fn non_numeric_rate_is_rejected() {
        let result = Cli::try_parse_from(["triton-loadgen", "simple", "fast"]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_rate_is_rejected() {
        let result = Cli::try_parse_from(["triton-loadgen", "simple"]);
        assert!(result.is_err());
    }

    #[test]
    fn non_positive_rate_fails_validation() {
        for rate in ["0", "-2"] {
            let cli = Cli::try_parse_from(["triton-loadgen", "simple", rate])
                .expect("negative numbers parse");
            assert!(matches!(cli.driver_config(), Err(AppError::Config(_))));
        }
    }

    #[tokio::test]
    async fn dry_run_prints_request_without_sending_it() {
        let server = MockServer::start_async().await;
        mock_config(&server).await;
        let infer = server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/models/simple/infer");
                then.status(200);
            })
            .await;

        let authority = server.address().to_string();
        let cli = Cli::try_parse_from([
            "triton-loadgen",
            "-a",
            authority.as_str(),
            "--dry-run",
            "simple",
            "1",
        ])
        .expect("CLI args should parse");

        let mut out = Vec::new();
        execute(&cli, &mut out).await.expect("dry run succeeds");

        let printed: serde_json::Value = serde_json::from_slice(&out).expect("output is json");
        assert_eq!(
            printed,
            json!({"inputs": [{"name": "INPUT0", "datatype": "FP32", "shape": [1, 3], "data": [0, 0, 0]}]})
        );
        assert_eq!(infer.hits_async().await, 0);
    }

    #[tokio::test]
    async fn server_error_fails_the_run_with_exit_code_one() {
        let server = MockServer::start_async().await;
        mock_config(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/models/simple/infer");
                then.status(500).body("model crashed");
            })
            .await;

        let authority = server.address().to_string();
        let cli = Cli::try_parse_from([
            "triton-loadgen",
            "-a",
            authority.as_str(),
            "--duration",
            "5",
            "simple",
            "20",
        ])
        .expect("CLI args should parse");

        let mut out = Vec::new();
        let err = execute(&cli, &mut out).await.unwrap_err();
        assert!(matches!(err, AppError::Status { status: 500, .. }));
        assert_eq!(exit_code(&err), 1);
        assert!(out.is_empty());
    }

    #[test]
    fn invalid_arguments_exit_with_code_two() {
        let cli = Cli::try_parse_from(["triton-loadgen", "simple", "0"])
            .expect("CLI args should parse");
        let err = cli.driver_config().unwrap_err();
        assert_eq!(exit_code(&err), 2);
        assert_eq!(exit_code(&AppError::Http("refused".into())), 1);
        assert_eq!(
            exit_code(&AppError::Status {
                status: 404,
                body: String::new()
            }),
            1
        );
    }

    #[test]
    fn invalid_durations_are_rejected() {
        assert!(seconds("--timeout", 0.0).is_err());
        assert!(seconds("--timeout", -1.0).is_err());
        assert!(seconds("--timeout", f64::NAN).is_err());
        assert!(seconds("--timeout", f64::INFINITY).is_err());
        assert!(seconds("--duration", 1e19).is_err());
        assert!(seconds("--timeout", 1e30).is_err());
        assert_eq!(seconds("--duration", 0.25).unwrap(), Duration::from_millis(250));
    }
}
