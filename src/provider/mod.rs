//! Transport provider contract and its built-in implementations (§4.3).

mod reqwest_provider;
#[ cfg( feature = "hyper-provider" ) ]
mod hyper_provider;

mod private
{
  use std::sync::atomic::{ AtomicU64, Ordering };
  use std::sync::Mutex;
  use std::time::{ Duration, Instant };

  use crate::config::Config;
  use crate::error::HttpClientResult;
  use crate::request::{ Request, RequestContext };
  use crate::response::Response;

  pub use super::reqwest_provider::ReqwestProvider;
  #[ cfg( feature = "hyper-provider" ) ]
  pub use super::hyper_provider::HyperProvider;

  /// Point-in-time snapshot of a provider's request/latency counters.
  ///
  /// Returned by value from [`Provider::get_metrics`] so callers never hold a
  /// lock on the provider's internal mutex (§5 shared-resource policy).
  #[ derive( Debug, Clone, Copy ) ]
  pub struct ProviderMetrics
  {
    /// Total requests dispatched since construction.
    pub total_requests : u64,
    /// Requests that completed without a transport error.
    pub successful_requests : u64,
    /// Requests that failed at the transport level.
    pub failed_requests : u64,
    /// Exponential moving average of request latency (α = 0.1).
    pub average_latency : Duration,
    /// Wall-clock time the most recent request was dispatched, if any.
    pub last_request_time : Option< Instant >,
  }

  impl ProviderMetrics
  {
    const fn zero() -> Self
    {
      Self
      {
        total_requests : 0,
        successful_requests : 0,
        failed_requests : 0,
        average_latency : Duration::ZERO,
        last_request_time : None,
      }
    }

    /// Fraction of requests that completed successfully, `0.0` when no
    /// requests have been made yet.
    #[ must_use ]
    pub fn success_rate( &self ) -> f64
    {
      if self.total_requests == 0
      {
        0.0
      }
      else
      {
        self.successful_requests as f64 / self.total_requests as f64
      }
    }
  }

  impl Default for ProviderMetrics
  {
    fn default() -> Self
    {
      Self::zero()
    }
  }

  /// Internal mutable counters backing [`ProviderMetrics`], shared by every
  /// provider implementation via composition rather than duplicated per type.
  #[ derive( Debug ) ]
  pub struct MetricsRecorder
  {
    total : AtomicU64,
    successful : AtomicU64,
    failed : AtomicU64,
    average_latency_nanos : AtomicU64,
    last_request_time : Mutex< Option< Instant > >,
  }

  impl MetricsRecorder
  {
    /// A fresh, all-zero recorder.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self
      {
        total : AtomicU64::new( 0 ),
        successful : AtomicU64::new( 0 ),
        failed : AtomicU64::new( 0 ),
        average_latency_nanos : AtomicU64::new( 0 ),
        last_request_time : Mutex::new( None ),
      }
    }

    /// Record the start of a request (step 1 of `doRequest`).
    pub fn record_start( &self )
    {
      self.total.fetch_add( 1, Ordering::Relaxed );
      if let Ok( mut guard ) = self.last_request_time.lock()
      {
        *guard = Some( Instant::now() );
      }
    }

    /// Record the outcome of a request (step 10 of `doRequest`) : updates the
    /// success/failure counters and folds `latency` into the EMA with α = 0.1.
    pub fn record_outcome( &self, success : bool, latency : Duration )
    {
      if success
      {
        self.successful.fetch_add( 1, Ordering::Relaxed );
      }
      else
      {
        self.failed.fetch_add( 1, Ordering::Relaxed );
      }

      const ALPHA : f64 = 0.1;
      let new_nanos = latency.as_nanos() as f64;
      let updated = loop
      {
        let current = self.average_latency_nanos.load( Ordering::Relaxed );
        let updated = if current == 0
        {
          new_nanos
        }
        else
        {
          ALPHA * new_nanos + ( 1.0 - ALPHA ) * current as f64
        };
        let updated_u64 = updated as u64;
        if self.average_latency_nanos
          .compare_exchange( current, updated_u64, Ordering::Relaxed, Ordering::Relaxed )
          .is_ok()
        {
          break updated_u64;
        }
      };
      let _ = updated;
    }

    /// A point-in-time copy of the current counters.
    #[ must_use ]
    pub fn snapshot( &self ) -> ProviderMetrics
    {
      ProviderMetrics
      {
        total_requests : self.total.load( Ordering::Relaxed ),
        successful_requests : self.successful.load( Ordering::Relaxed ),
        failed_requests : self.failed.load( Ordering::Relaxed ),
        average_latency : Duration::from_nanos( self.average_latency_nanos.load( Ordering::Relaxed ) ),
        last_request_time : self.last_request_time.lock().ok().and_then( |g| *g ),
      }
    }
  }

  impl Default for MetricsRecorder
  {
    fn default() -> Self
    {
      Self::new()
    }
  }

  /// Transport provider contract (§4.3). Every implementation owns its own
  /// connection pool and is otherwise interchangeable from the pipeline's
  /// point of view. [`Client`](crate::client::Client) is generic over `P :
  /// Provider` for the common single-transport case; [`do_request`](Provider::do_request)
  /// returns a boxed future so the trait is also usable as `Box<dyn
  /// Provider>` where heterogeneous transports must be held side by side.
  pub trait Provider : Send + Sync + std::fmt::Debug
  {
    /// Stable, human-readable identifier (e.g. `"reqwest"`).
    fn name( &self ) -> &str;

    /// Provider implementation version, independent of the crate version.
    fn version( &self ) -> &str;

    /// Apply a new configuration, rebuilding internal pools as needed.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::HttpClientError::Configuration`] if `config`
    /// fails validation.
    fn configure( &mut self, config : &Config ) -> HttpClientResult< () >;

    /// Reset to this provider's compiled-in defaults.
    fn set_defaults( &mut self );

    /// Execute the ten-step `doRequest` algorithm (§4.3 steps 1-10).
    ///
    /// Returns a boxed future rather than being declared `async fn` so that
    /// `Provider` stays object-safe : the [`crate::factory::Factory`]
    /// dispatches to one of several concrete providers through `Box<dyn
    /// Provider>`, which a native `async fn` in a trait cannot support.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::HttpClientError::Transport`] on a network
    /// failure, or [`crate::error::HttpClientError::Cancelled`] if `ctx` is
    /// canceled or its deadline elapses before a response is received.
    fn do_request< 'a >( &'a self, ctx : &'a mut RequestContext, req : &'a Request ) -> ProviderFuture< 'a, HttpClientResult< Response > >;

    /// `true` if the provider believes it can currently serve requests.
    fn is_healthy( &self ) -> bool;

    /// A snapshot copy of this provider's metrics.
    fn get_metrics( &self ) -> ProviderMetrics;
  }

  /// A boxed, owned future returned by [`Provider::do_request`].
  pub type ProviderFuture< 'a, T > = std::pin::Pin< Box< dyn std::future::Future< Output = T > + Send + 'a > >;

  impl Provider for Box< dyn Provider >
  {
    fn name( &self ) -> &str { ( **self ).name() }
    fn version( &self ) -> &str { ( **self ).version() }
    fn configure( &mut self, config : &Config ) -> HttpClientResult< () > { ( **self ).configure( config ) }
    fn set_defaults( &mut self ) { ( **self ).set_defaults(); }

    fn do_request< 'a >( &'a self, ctx : &'a mut RequestContext, req : &'a Request ) -> ProviderFuture< 'a, HttpClientResult< Response > >
    {
      ( **self ).do_request( ctx, req )
    }

    fn is_healthy( &self ) -> bool { ( **self ).is_healthy() }
    fn get_metrics( &self ) -> ProviderMetrics { ( **self ).get_metrics() }
  }

  /// Shared step 6 of `doRequest` : attach tracing headers when enabled.
  #[ must_use ]
  pub fn trace_headers( component : &str ) -> ( String, String, String )
  {
    let trace_id = format!( "{:032x}", uuid_like_nonce() );
    ( "X-Trace-ID".to_string(), trace_id, component.to_string() )
  }

  /// A process-unique, non-cryptographic nonce used to stamp trace ids
  /// without pulling in a UUID dependency the rest of the corpus doesn't use.
  fn uuid_like_nonce() -> u128
  {
    use std::sync::atomic::AtomicU64;
    static COUNTER : AtomicU64 = AtomicU64::new( 0 );
    let counter = COUNTER.fetch_add( 1, Ordering::Relaxed );
    let nanos = std::time::SystemTime::now()
      .duration_since( std::time::UNIX_EPOCH )
      .map( |d| d.as_nanos() )
      .unwrap_or( 0 );
    nanos ^ u128::from( counter )
  }

  /// Resolve the effective timeout for a request per §4.3 step 7 : the
  /// request's own timeout if set, else the config default.
  #[ must_use ]
  pub fn effective_timeout( req : &Request, config : &Config ) -> Duration
  {
    req.timeout.unwrap_or( config.timeout )
  }

  /// Apply the `Content-Type: application/json` default (§4.3 step 5) iff
  /// the header is absent and the body is a JSON body.
  pub fn apply_default_content_type( headers : &mut std::collections::HashMap< String, String >, body : &crate::request::Body )
  {
    let has_content_type = headers.keys().any( |k| k.eq_ignore_ascii_case( "content-type" ) );
    if has_content_type
    {
      return;
    }
    if matches!( body, crate::request::Body::Json( _ ) )
    {
      headers.insert( "Content-Type".to_string(), "application/json".to_string() );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    Provider,
    ProviderFuture,
    ProviderMetrics,
    MetricsRecorder,
    ReqwestProvider,
    trace_headers,
    effective_timeout,
    apply_default_content_type,
  };

  #[ cfg( feature = "hyper-provider" ) ]
  exposed use
  {
    HyperProvider,
  };
}
