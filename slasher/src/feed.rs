use anyhow::{bail, Result};
use futures::{
    channel::{
        mpsc::{self, UnboundedReceiver, UnboundedSender},
        oneshot,
    },
    future::{FutureExt as _, Shared},
    select,
    stream::StreamExt as _,
};
use log::{error, info, warn};

use crate::error::{Error, FeedKind};

/// Creates a feed of items with a matching subscription.
#[must_use]
pub fn channel<T>() -> (Feed<T>, Subscription<T>) {
    let (item_tx, item_rx) = mpsc::unbounded();
    let (error_tx, error_rx) = oneshot::channel();

    let feed = Feed {
        item_tx,
        error_tx: Some(error_tx),
    };

    let subscription = Subscription { item_rx, error_rx };

    (feed, subscription)
}

/// Creates a stop signal that can be shared by any number of listeners.
///
/// Dropping the [`Stopper`] stops listeners the same way [`Stopper::stop`] does.
#[must_use]
pub fn stop_signal() -> (Stopper, StopSignal) {
    let (stop_tx, stop_rx) = oneshot::channel();
    (Stopper(stop_tx), StopSignal(stop_rx.shared()))
}

/// Producing end of a feed. Dropping it closes the feed.
pub struct Feed<T> {
    item_tx: UnboundedSender<T>,
    error_tx: Option<oneshot::Sender<String>>,
}

impl<T> Feed<T> {
    pub fn send(&self, item: T) {
        if self.item_tx.unbounded_send(item).is_err() {
            warn!("send to feed subscription failed because the receiver was dropped");
        }
    }

    /// Reports a fault to the subscriber. The subscriber stops listening.
    pub fn fail(&mut self, reason: impl Into<String>) {
        let Some(error_tx) = self.error_tx.take() else {
            return;
        };

        if error_tx.send(reason.into()).is_err() {
            warn!("feed failure was not delivered because the receiver was dropped");
        }
    }
}

pub struct Subscription<T> {
    item_rx: UnboundedReceiver<T>,
    error_rx: oneshot::Receiver<String>,
}

impl<T> Subscription<T> {
    /// Passes items to `handle` until the feed closes, the feed fails or `stop` fires.
    ///
    /// Returns `Ok(())` only when stopped. Each item is handled to completion before the next
    /// event is looked at.
    pub async fn listen(
        self,
        feed: FeedKind,
        stop: StopSignal,
        mut handle: impl FnMut(T),
    ) -> Result<()> {
        let Self {
            mut item_rx,
            mut error_rx,
        } = self;

        let StopSignal(mut stop_rx) = stop;

        loop {
            select! {
                item = item_rx.next() => match item {
                    Some(item) => handle(item),
                    None => {
                        error!("{feed} feed closed");
                        bail!(Error::FeedClosed { feed });
                    }
                },
                result = &mut error_rx => {
                    // A dropped feed cancels the error channel. Buffered items are still handled.
                    if let Ok(reason) = result {
                        error!("{feed} feed failed: {reason}");
                        bail!(Error::FeedFailed { feed, reason });
                    }
                },
                _ = &mut stop_rx => {
                    info!("{feed} listener stopped");
                    break Ok(());
                },
            }
        }
    }
}

pub struct Stopper(oneshot::Sender<()>);

impl Stopper {
    pub fn stop(self) {
        // Listeners that already exited have dropped their receivers.
        self.0.send(()).ok();
    }
}

#[derive(Clone)]
pub struct StopSignal(Shared<oneshot::Receiver<()>>);
