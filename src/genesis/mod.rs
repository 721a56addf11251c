//! Genesis construction
//!
//! Encodes the authority set into `extraData` and serialises the descriptor
//! that every node is initialised from.

pub mod builder;

pub use builder::{
    decode_signers, encode_extra_data, ChainConfig, CliqueConfig, GenesisBuilder,
    GenesisDescriptor, CLIQUE_EPOCH, CLIQUE_PERIOD, SEAL_LEN, VANITY_LEN,
};
