use async_std::task::JoinHandle;
use stop_token::StopSource;

/// A running task that stops when its stop source is dropped.
pub struct ShutdownHandle {
    handle: JoinHandle<()>,
    stop_source: StopSource,
}

impl ShutdownHandle {
    pub fn new(handle: JoinHandle<()>, stop_source: StopSource) -> Self {
        ShutdownHandle {
            handle,
            stop_source,
        }
    }

    pub async fn graceful_shutdown(self) {
        drop(self.stop_source);
        self.handle.await
    }
}
