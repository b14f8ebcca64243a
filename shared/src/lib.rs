// lib.rs - Map and list synchronization core for the marketplace app

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod decluster;
pub mod error;
pub mod event;
pub mod fetch;
pub mod filters;
pub mod geo;
pub mod item;
pub mod location;
pub mod model;
pub mod selection;
pub mod sheet;
pub mod sync;
pub mod view;
pub mod virtual_list;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::EngineConfig;
pub use crux_core::{render::Render, App as CruxApp};
pub use error::{AppError, AppResult, ErrorKind, ErrorSeverity, UserFacingError};
pub use event::Event;
pub use geo::LatLon;
pub use item::{Category, Item, ItemId, UnixTimeMs};
pub use model::Model;
pub use selection::SheetPosition;
pub use sync::{MapListSync, SyncAction};
pub use view::ViewModel;
