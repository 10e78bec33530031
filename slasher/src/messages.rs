use futures::channel::mpsc::UnboundedSender;
use log::warn;
use types::phase0::containers::{AttesterSlashing, ProposerSlashing};

#[derive(Debug)]
pub enum SlashingEvidence {
    AttesterSlashing(AttesterSlashing),
    ProposerSlashing(ProposerSlashing),
}

impl SlashingEvidence {
    pub fn send(self, tx: &UnboundedSender<Self>) {
        if tx.unbounded_send(self).is_err() {
            warn!("send to slashing evidence sink failed because the receiver was dropped");
        }
    }
}
