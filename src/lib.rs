//! # ZeroStack client
//!
//! A command-line client for the ZeroStack search service. The service does
//! the ranking, document storage and dataset ingestion; this crate holds the
//! client side: the search and upload view state, the HTTP calls, and the
//! text presentation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌────────────────┐   HTTP   ┌───────────────┐
//! │ CLI / zs │──▶│ SearchClient │──▶│ SearchService  │────────▶│ search backend │
//! │  shell   │◀──│  ViewState   │   │ (HttpSearch…)  │         └───────────────┘
//! └──────────┘   └──────────────┘   └────────────────┘
//!       ▲               │
//!       └──── render ◀──┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! zs search "apple pie"              # search the default dataset
//! zs datasets                        # list uploaded datasets
//! zs upload --name books --file books.csv
//! zs search "tolkien" --dataset 3
//! zs shell                           # interactive session
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration |
//! | [`error`] | Error types |
//! | [`models`] | Wire types of the service's HTTP API |
//! | [`service`] | `SearchService` trait and HTTP implementation |
//! | [`state`] | Per-operation view state |
//! | [`client`] | Search, dataset and upload orchestration |
//! | [`render`] | Text rendering |
//! | [`progress`] | Loading indicator on stderr |
//! | [`session`] | Interactive session |

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod progress;
pub mod render;
pub mod service;
pub mod session;
pub mod state;
