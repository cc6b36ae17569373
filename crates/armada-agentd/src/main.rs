use std::{path::PathBuf, sync::Arc};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use armada_core::{FileTokenStore, JobOrchestrator, into_job_result};
use armada_grpc::GrpcJobService;
use armada_observe::init_logger;
use armada_prometheus::{PrometheusMetrics, TextEncoder};

mod config;
use config::{AgentConfig, ENDPOINT_ENV};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // 1) config + logger
    let path = std::env::args_os().nth(1).map(PathBuf::from);
    let cfg = AgentConfig::load(path.as_deref(), std::env::var(ENDPOINT_ENV).ok())?;
    init_logger(&cfg.logger)?;
    info!(endpoint = %cfg.channel.endpoint, "logger initialized");

    // 2) transport + metrics
    let service = Arc::new(GrpcJobService::connect_lazy(&cfg.channel)?);
    let metrics = PrometheusMetrics::new()?;

    // 3) orchestrator
    let mut orchestrator = JobOrchestrator::new(service, cfg.orchestrator.clone())?
        .with_metrics(Arc::new(metrics.clone()));
    if let Some(dir) = &cfg.token_dir {
        orchestrator = orchestrator.with_token_store(Arc::new(FileTokenStore::open(dir.clone())?));
        info!(dir = %dir.display(), "persisting resumption tokens");
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted; cancelling remote jobs");
                cancel.cancel();
            }
        }
    });

    // 4) jobs parked by an earlier run
    for token in orchestrator.persisted_tokens()? {
        let job_id = token.handle().job_id().clone();
        match orchestrator.resume_job(token, cancel.child_token()).await {
            Ok(outcome) => info!(%job_id, %outcome, "resumed job finished"),
            Err(e) => warn!(%job_id, error = %e, "resumed job errored"),
        }
    }

    // 5) hello step, then the remote job
    info!("Hello World!");
    let descriptor = cfg.job.descriptor()?;
    let outcome = orchestrator
        .run_job_with_cancel(descriptor, cfg.orchestrator.deferrable, cancel)
        .await?;

    if let Ok(text) = TextEncoder::new().encode_to_string(&metrics.gather()) {
        debug!(metrics = %text, "final metrics");
    }

    let job_id = into_job_result(outcome)?;
    info!(%job_id, "done");
    Ok(())
}
