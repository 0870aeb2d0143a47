//! Ordered middleware chain (§4.4) : registration-order entry, reverse-order
//! exit, identity-based add/remove, guarded by a reader-writer lock.

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use std::collections::HashMap;
  use std::future::Future;
  use std::pin::Pin;
  use std::sync::Arc;
  use std::time::{ Duration, Instant };

  use crate::error::HttpClientResult;
  use crate::request::{ Request, RequestContext };
  use crate::response::Response;

  /// A boxed, owned future returning a pipeline result, used because `async
  /// fn` in a `dyn`-safe trait object is not expressible on stable without
  /// one.
  pub type BoxFuture< 'a, T > = Pin< Box< dyn Future< Output = T > + Send + 'a > >;

  /// The next handler in the chain : either the next middleware or, for the
  /// last one, the terminal (retry-wrapped) provider call.
  pub type Next< 'a > = Arc< dyn Fn( &'a mut RequestContext, &'a Request ) -> BoxFuture< 'a, HttpClientResult< Response > > + Send + Sync >;

  /// A single middleware : intercepts a request/response pair around `next`.
  pub trait Middleware : Send + Sync
  {
    /// Identity used for [`MiddlewareChain::remove`] : two middlewares are
    /// the same entry iff their ids match.
    fn id( &self ) -> &str;

    /// Invoke this middleware, calling `next` to continue the chain.
    fn call< 'a >
    (
      &'a self,
      ctx : &'a mut RequestContext,
      req : &'a Request,
      next : Next< 'a >,
    ) -> BoxFuture< 'a, HttpClientResult< Response > >;
  }

  /// Ordered, identity-deduplicated, RwLock-guarded middleware list.
  #[ derive( Default ) ]
  pub struct MiddlewareChain
  {
    entries : tokio::sync::RwLock< Vec< Arc< dyn Middleware > > >,
  }

  impl std::fmt::Debug for MiddlewareChain
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.debug_struct( "MiddlewareChain" ).finish_non_exhaustive()
    }
  }

  impl MiddlewareChain
  {
    /// An empty chain.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Append `middleware`, unless a middleware with the same [`Middleware::id`]
    /// is already present.
    pub async fn add( &self, middleware : Arc< dyn Middleware > )
    {
      let mut guard = self.entries.write().await;
      if !guard.iter().any( |m| m.id() == middleware.id() )
      {
        guard.push( middleware );
      }
    }

    /// Remove the middleware with the given id; a no-op if not present.
    pub async fn remove( &self, id : &str )
    {
      let mut guard = self.entries.write().await;
      guard.retain( |m| m.id() != id );
    }

    /// Take a snapshot of the current chain under the read lock, then
    /// release it before any invocation runs (§5 shared-resource policy).
    ///
    /// [`crate::client::Client`]'s own `run_chain` folds this snapshot over
    /// the terminal provider call by per-index recursion rather than the
    /// `'static`-bound closure fold this type used to offer, since it needs
    /// to borrow `&self`/`ctx`/`req` for a call-scoped lifetime instead of
    /// `'static` (§4.4 composition rule, same entry/exit order either way).
    pub async fn snapshot( &self ) -> Vec< Arc< dyn Middleware > >
    {
      self.entries.read().await.clone()
    }
  }

  /// Logs before dispatch and after completion (duration included).
  pub struct LoggingMiddleware
  {
    id : String,
  }

  impl LoggingMiddleware
  {
    /// A logging middleware with a fixed identity.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self { id : "builtin.logging".to_string() }
    }
  }

  impl Default for LoggingMiddleware
  {
    fn default() -> Self
    {
      Self::new()
    }
  }

  impl Middleware for LoggingMiddleware
  {
    fn id( &self ) -> &str
    {
      &self.id
    }

    fn call< 'a >
    (
      &'a self,
      ctx : &'a mut RequestContext,
      req : &'a Request,
      next : Next< 'a >,
    ) -> BoxFuture< 'a, HttpClientResult< Response > >
    {
      Box::pin( async move
      {
        tracing::debug!( method = %req.method, url = %req.url, "dispatching request" );
        let started = Instant::now();
        let outcome = next( ctx, req ).await;
        let elapsed = started.elapsed();
        match &outcome
        {
          Ok( resp ) => tracing::debug!( status = resp.status_code, elapsed_ms = elapsed.as_millis(), "request completed" ),
          Err( err ) => tracing::warn!( %err, elapsed_ms = elapsed.as_millis(), "request failed" ),
        }
        outcome
      } )
    }
  }

  /// Wraps the downstream chain in its own retry loop, for callers who want
  /// retry scoped to an explicit position in the middleware chain instead of
  /// relying on the pipeline's own [`crate::retry::with_retry`] wrapper
  /// around the terminal provider call. Duplicates that loop's shape rather
  /// than reusing it directly : `with_retry` is generic over a dispatch
  /// closure bound by a higher-ranked lifetime so it can wrap a provider's
  /// own `do_request<'a>`, while a [`Next<'a>`] here already has its `'a`
  /// fixed by the surrounding `call`, so the two dispatch shapes don't unify.
  pub struct RetryMiddleware
  {
    id : String,
    retry_config : crate::config::RetryConfig,
  }

  impl RetryMiddleware
  {
    /// Build from a retry policy; independent of any `Client`'s own
    /// `RetryConfig`.
    #[ must_use ]
    pub fn new( retry_config : crate::config::RetryConfig ) -> Self
    {
      Self { id : "builtin.retry".to_string(), retry_config }
    }
  }

  impl Middleware for RetryMiddleware
  {
    fn id( &self ) -> &str
    {
      &self.id
    }

    fn call< 'a >
    (
      &'a self,
      ctx : &'a mut RequestContext,
      req : &'a Request,
      next : Next< 'a >,
    ) -> BoxFuture< 'a, HttpClientResult< Response > >
    {
      Box::pin( async move
      {
        let mut last : HttpClientResult< Response > = Err( crate::error::HttpClientError::Internal( "retry middleware never dispatched".to_string() ) );

        for attempt in 0..=self.retry_config.max_retries
        {
          if attempt > 0
          {
            let delay = crate::retry::delay_for_attempt( &self.retry_config, attempt );
            tokio::select!
            {
              () = tokio::time::sleep( delay ) => {},
              () = ctx.cancelled() => return Err( crate::error::HttpClientError::Cancelled ),
            }
          }

          last = next( ctx, req ).await;

          let ( response_ref, error_ref ) = match &last
          {
            Ok( resp ) => ( Some( resp ), None ),
            Err( err ) => ( None, Some( err ) ),
          };

          if !( self.retry_config.retry_condition )( response_ref, error_ref )
          {
            break;
          }
        }

        last
      } )
    }
  }

  /// Injects a static or provider-supplied header on every request.
  pub struct AuthMiddleware
  {
    id : String,
    header_name : String,
    header_value : Arc< dyn Fn() -> String + Send + Sync >,
  }

  impl AuthMiddleware
  {
    /// A static `Authorization`-style header applied to every request.
    #[ must_use ]
    pub fn static_header( header_name : impl Into< String >, value : impl Into< String > ) -> Self
    {
      let value = value.into();
      Self { id : "builtin.auth".to_string(), header_name : header_name.into(), header_value : Arc::new( move || value.clone() ) }
    }

    /// A header whose value is recomputed on every request (e.g. a rotating token).
    #[ must_use ]
    pub fn dynamic_header( header_name : impl Into< String >, provider : impl Fn() -> String + Send + Sync + 'static ) -> Self
    {
      Self { id : "builtin.auth".to_string(), header_name : header_name.into(), header_value : Arc::new( provider ) }
    }
  }

  impl Middleware for AuthMiddleware
  {
    fn id( &self ) -> &str
    {
      &self.id
    }

    fn call< 'a >
    (
      &'a self,
      ctx : &'a mut RequestContext,
      req : &'a Request,
      next : Next< 'a >,
    ) -> BoxFuture< 'a, HttpClientResult< Response > >
    {
      Box::pin( async move
      {
        let mut patched = req.clone();
        patched.headers.insert( self.header_name.clone(), ( self.header_value )() );
        next( ctx, &patched ).await
      } )
    }
  }

  /// Sets `Accept-Encoding` from the configured compression types.
  pub struct CompressionMiddleware
  {
    id : String,
    accept_encoding : String,
  }

  impl CompressionMiddleware
  {
    /// Build from the comma-joined list of accepted content-encodings.
    #[ must_use ]
    pub fn new( compression_types : &[ String ] ) -> Self
    {
      Self { id : "builtin.compression".to_string(), accept_encoding : compression_types.join( ", " ) }
    }
  }

  impl Middleware for CompressionMiddleware
  {
    fn id( &self ) -> &str
    {
      &self.id
    }

    fn call< 'a >
    (
      &'a self,
      ctx : &'a mut RequestContext,
      req : &'a Request,
      next : Next< 'a >,
    ) -> BoxFuture< 'a, HttpClientResult< Response > >
    {
      Box::pin( async move
      {
        let mut patched = req.clone();
        patched.headers.entry( "Accept-Encoding".to_string() ).or_insert_with( || self.accept_encoding.clone() );
        next( ctx, &patched ).await
      } )
    }
  }

  /// Collected observation passed to a [`MetricsMiddleware`] callback.
  #[ derive( Debug, Clone ) ]
  pub struct MetricsObservation
  {
    /// HTTP method of the completed request.
    pub method : String,
    /// URL of the completed request.
    pub url : String,
    /// Status code, if a response was obtained.
    pub status : Option< u16 >,
    /// Wall-clock duration of the call.
    pub duration : Duration,
    /// Error message, if the call failed.
    pub error : Option< String >,
  }

  /// Invokes a collector callback with method/url/status/duration/error.
  pub struct MetricsMiddleware
  {
    id : String,
    collector : Arc< dyn Fn( MetricsObservation ) + Send + Sync >,
  }

  impl MetricsMiddleware
  {
    /// Build from a collector callback.
    #[ must_use ]
    pub fn new( collector : impl Fn( MetricsObservation ) + Send + Sync + 'static ) -> Self
    {
      Self { id : "builtin.metrics".to_string(), collector : Arc::new( collector ) }
    }
  }

  impl Middleware for MetricsMiddleware
  {
    fn id( &self ) -> &str
    {
      &self.id
    }

    fn call< 'a >
    (
      &'a self,
      ctx : &'a mut RequestContext,
      req : &'a Request,
      next : Next< 'a >,
    ) -> BoxFuture< 'a, HttpClientResult< Response > >
    {
      Box::pin( async move
      {
        let started = Instant::now();
        let outcome = next( ctx, req ).await;
        let observation = MetricsObservation
        {
          method : req.method.to_string(),
          url : req.url.clone(),
          status : outcome.as_ref().ok().map( |r| r.status_code ),
          duration : started.elapsed(),
          error : outcome.as_ref().err().map( std::string::ToString::to_string ),
        };
        ( self.collector )( observation );
        outcome
      } )
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use crate::request::Method;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    fn dummy_response() -> Response
    {
      Response::from_parts( 200, Vec::new(), HashMap::new(), Duration::ZERO, "c".to_string() )
    }

    #[ tokio::test ]
    async fn add_is_idempotent_by_id()
    {
      let chain = MiddlewareChain::new();
      chain.add( Arc::new( LoggingMiddleware::new() ) ).await;
      chain.add( Arc::new( LoggingMiddleware::new() ) ).await;
      assert_eq!( chain.snapshot().await.len(), 1 );
    }

    #[ tokio::test ]
    async fn remove_is_noop_when_absent()
    {
      let chain = MiddlewareChain::new();
      chain.remove( "nonexistent" ).await;
      assert!( chain.snapshot().await.is_empty() );
    }

    #[ tokio::test ]
    async fn metrics_middleware_observes_terminal_outcome()
    {
      let counter = Arc::new( AtomicUsize::new( 0 ) );
      let counter_clone = counter.clone();
      let middleware = MetricsMiddleware::new( move |obs| {
        assert_eq!( obs.status, Some( 200 ) );
        counter_clone.fetch_add( 1, Ordering::SeqCst );
      } );

      let terminal : Next< 'static > = Arc::new( |_ctx, _req| Box::pin( async { Ok( dummy_response() ) } ) );
      let mut ctx = RequestContext::default();
      let req = Request::new( Method::Get, "/x" );
      let result = middleware.call( &mut ctx, &req, terminal ).await;

      assert!( result.is_ok() );
      assert_eq!( counter.load( Ordering::SeqCst ), 1 );
    }

    #[ tokio::test ]
    async fn retry_middleware_retries_until_success_status()
    {
      let retry_config = crate::config::RetryConfig::default_retry_config()
        .with_max_retries( 5 )
        .with_initial_interval( Duration::from_millis( 1 ) )
        .with_retry_condition( Arc::new( |resp, _err| resp.is_none_or( |r| r.status_code >= 500 ) ) );
      let middleware = RetryMiddleware::new( retry_config );

      let attempts = Arc::new( AtomicUsize::new( 0 ) );
      let attempts_clone = attempts.clone();
      let terminal : Next< 'static > = Arc::new( move |_ctx, _req| {
        let attempts = attempts_clone.clone();
        Box::pin( async move
        {
          let n = attempts.fetch_add( 1, Ordering::SeqCst );
          let status = if n < 2 { 503 } else { 200 };
          Ok( Response::from_parts( status, Vec::new(), HashMap::new(), Duration::ZERO, "c".to_string() ) )
        } )
      } );

      let mut ctx = RequestContext::default();
      let req = Request::new( Method::Get, "/x" );
      let result = middleware.call( &mut ctx, &req, terminal ).await;

      assert!( result.is_ok() );
      assert_eq!( result.unwrap().status_code, 200 );
      assert_eq!( attempts.load( Ordering::SeqCst ), 3 );
    }

    #[ tokio::test ]
    async fn retry_middleware_exhausts_retries_and_returns_last_error()
    {
      let retry_config = crate::config::RetryConfig::default_retry_config()
        .with_max_retries( 2 )
        .with_initial_interval( Duration::from_millis( 1 ) );
      let middleware = RetryMiddleware::new( retry_config );

      let attempts = Arc::new( AtomicUsize::new( 0 ) );
      let attempts_clone = attempts.clone();
      let terminal : Next< 'static > = Arc::new( move |_ctx, _req| {
        let attempts = attempts_clone.clone();
        Box::pin( async move
        {
          attempts.fetch_add( 1, Ordering::SeqCst );
          Err( crate::error::HttpClientError::Transport( "boom".to_string() ) )
        } )
      } );

      let mut ctx = RequestContext::default();
      let req = Request::new( Method::Get, "/x" );
      let result = middleware.call( &mut ctx, &req, terminal ).await;

      assert!( result.is_err() );
      assert_eq!( attempts.load( Ordering::SeqCst ), 3 );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    BoxFuture,
    Next,
    Middleware,
    MiddlewareChain,
    LoggingMiddleware,
    RetryMiddleware,
    AuthMiddleware,
    CompressionMiddleware,
    MetricsMiddleware,
    MetricsObservation,
  };
}
