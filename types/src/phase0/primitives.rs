use fixed_hash::construct_fixed_hash;
use impl_serde::impl_fixed_hash_serde;

pub use ethereum_types::H256;

pub type CommitteeIndex = u64;
pub type Epoch = u64;
pub type Slot = u64;
pub type ValidatorIndex = u64;

// Signatures are verified before objects reach the slasher.
// They are carried around as opaque bytes so that evidence can be submitted as received.
construct_fixed_hash! {
    #[derive(derive_more::AsRef)]
    pub struct SignatureBytes(96);
}

impl_fixed_hash_serde!(SignatureBytes, 96);
