//! Facilitator service: owns the Mirror lifecycle and serves resolved
//! routing + policy records to every other service in the mesh.

pub mod controller;
pub mod error;
pub mod handlers;
pub mod policy_store;
pub mod state;

pub use controller::FacilitatorController;
pub use policy_store::PolicyStore;
pub use state::FacilitatorState;
