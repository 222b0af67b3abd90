use crate::db::RemoteStore;
use crate::models::line::{InputLine, LineSource};
use crate::processor::detector::{self, Debouncer};
use crate::processor::emitter;
use chrono::Utc;
use rand::rngs::StdRng;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::Receiver;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Everything the relay loop needs, owned in one place.
pub struct AppContext {
    store: Arc<dyn RemoteStore>,
    rng: StdRng,
    debouncer: Debouncer,
    in_flight: JoinSet<()>,
}

impl AppContext {
    pub fn new(store: Arc<dyn RemoteStore>, rng: StdRng, debounce: Option<Duration>) -> Self {
        Self {
            store,
            rng,
            debouncer: Debouncer::new(debounce),
            in_flight: JoinSet::new(),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns true when the line started an alert write.
    ///
    /// The writes run on their own task so the loop keeps accepting input;
    /// writes from overlapping triggers may complete in any order.
    pub fn process_line(&mut self, line: InputLine) -> bool {
        if line.source == LineSource::Serial {
            info!("Device says: {}", line.text);
        }

        if !detector::is_trigger(&line) {
            return false;
        }

        match line.source {
            LineSource::Serial => warn!("SOS signal received from device! Sending alert..."),
            LineSource::Console => warn!("Manual/simulated SOS triggered!"),
        }

        if !self.debouncer.admit(Instant::now()) {
            debug!(source = %line.source, "Trigger suppressed by debounce window");
            return false;
        }

        let record = emitter::build_record(&mut self.rng, Utc::now().timestamp_millis());
        let store = Arc::clone(&self.store);
        self.in_flight.spawn(async move {
            if let Err(e) = emitter::emit(store.as_ref(), &record).await {
                error!(user_id = %record.user_id, "Error sending alert: {}", e);
            }
        });

        self.reap_finished();
        true
    }

    fn reap_finished(&mut self) {
        while let Some(result) = self.in_flight.try_join_next() {
            if let Err(e) = result {
                error!("Alert write task failed: {}", e);
            }
        }
    }

    /// Waits for every in-flight write.
    pub async fn drain(&mut self) {
        while let Some(result) = self.in_flight.join_next().await {
            if let Err(e) = result {
                error!("Alert write task failed: {}", e);
            }
        }
    }

    /// Best-effort flush at teardown; writes still pending after `grace` are
    /// abandoned.
    pub async fn shutdown(mut self, grace: Duration) {
        let pending = self.in_flight();
        if pending > 0 {
            info!("Waiting for {} in-flight alert write(s)...", pending);
        }

        if tokio::time::timeout(grace, self.drain()).await.is_err() {
            warn!(
                "Abandoning {} alert write(s) still pending after {:?}",
                self.in_flight(),
                grace
            );
            self.in_flight.abort_all();
        }
    }
}

/// Relays lines until `shutdown` resolves or every line source hangs up.
pub async fn run<S>(ctx: &mut AppContext, mut lines: Receiver<InputLine>, shutdown: S)
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            maybe_line = lines.recv() => match maybe_line {
                Some(line) => {
                    ctx.process_line(line);
                }
                None => {
                    info!("All line sources closed");
                    break;
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        }
    }
}
