pub mod contract;

pub use contract::{Contract, ContractId, ContractStatus, ContractSummary};
