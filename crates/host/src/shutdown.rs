use std::sync::Arc;

use tokio::sync::watch;

use arxlink_common::backend::ExitControl;

/// Process exit request, shared by the controller and the D-Bus surface.
#[derive(Clone)]
pub struct ShutdownSignal {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownSignal {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx: Arc::new(tx) }, rx)
    }

    pub fn is_requested(&self) -> bool {
        *self.tx.borrow()
    }
}

impl ExitControl for ShutdownSignal {
    fn terminate(&self) {
        self.tx.send_if_modified(|requested| !std::mem::replace(requested, true));
    }
}

/// Resolves once termination was requested or every signal handle is gone.
pub async fn requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|requested| *requested).await;
}
