//! Session coordination for the shader playground.
//!
//! Selection flows one way (catalog ▶ coordinator ▶ pipeline ▶ renderer) and
//! compile feedback loops back over the bus (renderer ▶ bus ▶ coordinator ▶
//! catalog). The coordinator lives on the UI timeline; the renderer's frame
//! timeline never touches the catalog.

mod coordinator;

pub use coordinator::SessionCoordinator;
