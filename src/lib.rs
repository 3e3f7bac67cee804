pub mod browser;
pub mod config;
pub mod driver;
pub mod error;
pub mod graph;
pub mod oracle;
pub mod step;
pub mod store;
pub mod surface;
pub mod vision;

//  Re-export commonly used items
pub use browser::chrome::{ChromeDriver, ConnectionMode};
pub use config::JourneyConfig;
pub use driver::{AutomationDriver, CancelHandle, SessionState};
pub use error::{JourneyError, Result};
pub use graph::{find_path, BuildReport, Edge, EdgeInsert, Graph, Node};
pub use oracle::{
    ClaudeOracle, ElementChoice, GoalCheck, JourneyOracle, NextAction, NextActionRequest, Persona,
    PersonaAttributes,
};
pub use step::{ImageRef, JourneyOutcome, JourneyStep, StepAction};
pub use store::{ImageStore, LocalImageStore};
pub use surface::Surface;
pub use vision::{Detection, DetectorOptions, FlashPolicy, Rectangle, Region, RegionDetector};
