#![ doc( html_root_url = "https://docs.rs/http_client_core/latest/http_client_core/" ) ]
#![ cfg_attr( doc, doc = include_str!( concat!( env!( "CARGO_MANIFEST_DIR" ), "/", "readme.md" ) ) ) ]

// Strategic clippy configuration for a comprehensive HTTP client core
#![allow(clippy::missing_inline_in_public_items)]
#![allow(clippy::std_instead_of_core)]
#![allow(clippy::must_use_candidate)]

//! Provider-abstracted HTTP client core.
//!
//! This crate is the execution engine beneath a production HTTP client : a
//! process-wide client manager guaranteeing at-most-once construction per
//! named client, a request pipeline (hooks → middleware chain → retry →
//! transport provider), a transport provider abstraction with at least two
//! independent implementations, a batch executor with three dispatch
//! strategies, and a streaming response processor.
//!
//! # Governing Principle : "Pluggable Transport, Uniform Pipeline"
//!
//! Every concern that is not "put bytes on the wire" — retry, hooks,
//! middleware, batching, streaming, error handling — lives above the
//! [`Provider`] trait and is therefore identical no matter which transport
//! backs a [`Client`]. Swapping [`ReqwestProvider`] for [`HyperProvider`]
//! changes connection pooling and wire behavior only.
//!
//! ## Core Principles
//!
//! - **Uniform Contract**: every provider implements the same ten-step
//!   `do_request` algorithm (validate → compose URL → marshal body → dispatch
//!   → build response → update metrics).
//! - **At-most-once construction**: [`ClientManager::get_or_create`] performs
//!   correct double-checked locking so concurrent callers asking for the same
//!   named client never race a second construction.
//! - **Explicit reliability**: retry, circuit breaking, rate limiting, and
//!   failover are opt-in, feature-gated, and never enabled by magic defaults.
//!
//! ## State Management Policy
//!
//! Runtime-stateful, process-stateless: connection pools, circuit breaker
//! state, rate limiter buckets, and retry state all live for the lifetime of
//! the process and nowhere else. Nothing in this crate writes to disk or
//! survives a restart.
//!
//! # Examples
//!
//! ```no_run
//! use http_client_core::{ Client, Config, ReqwestProvider };
//!
//! # async fn example() -> Result< (), Box< dyn std::error::Error > > {
//! let config = Config::default_config().with_base_url( "https://api.example.com".to_string() );
//! let provider = ReqwestProvider::new( &config )?;
//! let client = Client::new( provider, config );
//!
//! let response = client.get( "/v1/status" ).await?;
//! println!( "status : {}", response.status_code );
//! # Ok( () )
//! # }
//! ```

#[ cfg( feature = "enabled" ) ]
use mod_interface::mod_interface;

mod private {}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  layer error;
  layer config;
  layer request;
  layer response;
  layer unmarshal;
  layer provider;
  layer middleware;
  layer hooks;
  #[ cfg( feature = "retry" ) ]
  layer retry;
  #[ cfg( feature = "batch" ) ]
  layer batch;
  #[ cfg( feature = "streaming" ) ]
  layer streaming;
  layer client;
  layer manager;
  layer factory;
  #[ cfg( feature = "compression" ) ]
  layer compression;
  #[ cfg( feature = "circuit-breaker" ) ]
  layer circuit_breaker;
  #[ cfg( feature = "rate-limiting" ) ]
  layer rate_limiting;
  #[ cfg( feature = "failover" ) ]
  layer failover;
  #[ cfg( feature = "health-checks" ) ]
  layer health_checks;
}

/// Serde-related exports.
#[ cfg( feature = "enabled" ) ]
pub mod ser
{
  pub use serde::
  {
    Serialize,
    Deserialize,
  };
}

/// Error-related exports.
#[ cfg( feature = "enabled" ) ]
pub mod error_tools
{
  pub use::error_tools::*;
  pub use::error_tools::dependency::thiserror;
}
