// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod autosave;
pub mod editor;
pub mod forms;
pub mod ids;
pub mod model;
pub mod state;

pub use autosave::*;
pub use editor::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use state::*;
