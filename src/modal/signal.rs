use tokio::sync::mpsc;

/// Payloads fed back to a modal through its signal channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ModalSignal {
    /// The dialog widget finished presenting
    Shown,
    /// The dialog widget finished dismissing
    Hidden,
    /// A close-phase animate hook released the pending hide
    ProceedClose,
    /// Something asked for a close on the next pump
    CloseRequested,
}

/// Sending side of a modal's signal channel, held by its dialog widget.
///
/// The widget contract is one-shot in both directions: call
/// [`shown`](Self::shown) exactly once when presentation completes and
/// [`hidden`](Self::hidden) exactly once when dismissal completes. The modal
/// ignores duplicates, but a missing call leaves it stuck in a transitional
/// state.
#[derive(Debug, Clone)]
pub struct SignalHandle {
    tx: mpsc::UnboundedSender<ModalSignal>,
}

impl SignalHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ModalSignal>) -> Self {
        Self { tx }
    }

    /// Report that the dialog surface is fully presented
    pub fn shown(&self) {
        self.send(ModalSignal::Shown);
    }

    /// Report that the dialog surface is fully dismissed
    pub fn hidden(&self) {
        self.send(ModalSignal::Hidden);
    }

    pub(crate) fn send(&self, signal: ModalSignal) {
        // The receiver only drops with the modal itself
        let _ = self.tx.send(signal);
    }
}

/// Continuation token handed to a custom animate hook.
///
/// For the close phase the modal defers its hide delegation until
/// [`proceed`](Self::proceed) is called; dropping the gate without calling it
/// leaves the modal waiting in its closing state. For the open phase the gate
/// is informational and proceeding is a no-op.
#[derive(Debug)]
pub struct AnimateGate {
    handle: SignalHandle,
}

impl AnimateGate {
    pub(crate) fn new(handle: SignalHandle) -> Self {
        Self { handle }
    }

    /// Let the pending close continue
    pub fn proceed(self) {
        self.handle.send(ModalSignal::ProceedClose);
    }
}
