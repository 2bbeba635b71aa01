//! TUF metadata: schema types and canonical-JSON signing

pub mod schema;
pub mod signing;

pub use schema::{
    DelegatedRole, Delegations, MetaFile, RoleKeys, Root, Signature, Signed, Snapshot,
    TargetDescription, Targets, Timestamp, SPEC_VERSION,
};
pub use signing::{sign_metadata, verify_metadata};
