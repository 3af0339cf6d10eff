//! HTTP client for the remote music catalog
//!
//! Implements [`voxcore::CatalogClient`] over the catalog's REST API:
//!
//! - **[`api`]**: low-level access layer (auth, track, radio endpoints)
//! - **[`models`]**: serde wire models and conversions to the core model
//! - **[`RemoteCatalog`]**: authenticated high-level client
//!
//! Authentication is token-first with a username/password fallback; captcha
//! demands surface as [`CatalogError::CaptchaRequired`] so the operator can
//! resolve them out of band.

pub mod api;
pub mod client;
pub mod error;
pub mod models;

pub use api::CatalogApi;
pub use api::auth::AuthInfo;
pub use client::RemoteCatalog;
pub use error::{CatalogError, Result};
