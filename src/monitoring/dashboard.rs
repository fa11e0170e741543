use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::select;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};
use tracing::{debug, info, warn};

use crate::monitoring::metrics::{log_metrics_snapshot, METRICS};
use crate::types::MonitoringConfig;

/// Periodically log a metrics snapshot; the task ends when the handle is aborted.
pub fn spawn_dashboard_task(period: Duration) -> JoinHandle<()> {
    let mut ticker = interval(period);
    tokio::spawn(async move {
        loop {
            ticker.tick().await;
            log_metrics_snapshot(&METRICS.snapshot());
        }
    })
}

fn health_response(healthy: bool) -> String {
    let (status, body) = if healthy {
        ("200 OK", "OK")
    } else {
        ("503 Service Unavailable", "STALE")
    };
    format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

/// A client that sends nothing for this long is dropped without a response.
const HEALTH_READ_TIMEOUT: Duration = Duration::from_secs(2);

async fn respond(mut socket: TcpStream, max_staleness: Duration) -> std::io::Result<()> {
    let mut buf = [0u8; 1024];

    // The request is drained but not routed.
    timeout(HEALTH_READ_TIMEOUT, socket.readable())
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "no request received"))??;
    let _ = socket.try_read(&mut buf);

    let response = health_response(METRICS.is_healthy(max_staleness));
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}

async fn serve_health_on(listener: TcpListener, max_staleness: Duration) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = listener.accept().await?;
        tokio::spawn(async move {
            if let Err(err) = respond(socket, max_staleness).await {
                warn!(target: "metrics", %peer, error = %err, "health request failed");
            } else {
                debug!(target: "metrics", %peer, "health request served");
            }
        });
    }
}

/// Minimal TCP health endpoint: every connection gets one HTTP response
/// reporting whether the runtime loop is still ticking. Connections are
/// served on their own tasks, so a slow client never blocks the next one.
pub async fn serve_health(addr: &str, max_staleness: Duration) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(target: "metrics", addr, "health endpoint listening");
    serve_health_on(listener, max_staleness).await
}

/// Run the dashboard logger, and the health server when an address is
/// configured, until `shutdown` fires.
pub async fn run_monitoring(cfg: MonitoringConfig, mut shutdown: oneshot::Receiver<()>) -> anyhow::Result<()> {
    let dashboard = spawn_dashboard_task(cfg.dashboard_period_secs);

    let result = match cfg.health_addr.as_deref() {
        Some(addr) => select! {
            res = serve_health(addr, cfg.max_staleness_secs) => res,
            _ = &mut shutdown => Ok(()),
        },
        None => {
            let _ = (&mut shutdown).await;
            Ok(())
        }
    };

    dashboard.abort();
    result
}
