//! Client façade : verb methods and the `Execute` pipeline orchestration (§4.9).

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use std::pin::Pin;
  use std::sync::Arc;
  use std::future::Future;

  use crate::config::Config;
  use crate::error::HttpClientResult;
  use crate::hooks::HookList;
  use crate::middleware::{ Middleware, MiddlewareChain, Next as MiddlewareNext, BoxFuture as MiddlewareBoxFuture };
  use crate::provider::Provider;
  use crate::request::{ Body, Method, Request, RequestContext };
  use crate::response::Response;
  use crate::unmarshal::{ Structured, Unmarshal };

  /// Maps a completed response to an override error, preserving the response
  /// (§4.9 step 6). `None` leaves the call's outcome untouched.
  pub type ErrorHandler = Arc< dyn Fn( &Response ) -> Option< crate::error::HttpClientError > + Send + Sync >;

  /// The request pipeline bound to one [`Provider`] instance and one
  /// [`Config`] (§3 `Client state`).
  pub struct Client< P : Provider >
  {
    provider : P,
    config : Config,
    middlewares : MiddlewareChain,
    hooks : HookList,
    error_handler : Option< ErrorHandler >,
    name : std::sync::Mutex< Option< String > >,
  }

  impl< P : Provider > std::fmt::Debug for Client< P >
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.debug_struct( "Client" )
        .field( "provider", &self.provider.name() )
        .field( "name", &self.name.lock().ok().and_then( |g| g.clone() ) )
        .finish_non_exhaustive()
    }
  }

  impl< P : Provider > Client< P >
  {
    /// Build a client from a constructed provider and its config.
    #[ must_use ]
    pub fn new( provider : P, config : Config ) -> Self
    {
      Self
      {
        provider,
        config,
        middlewares : MiddlewareChain::new(),
        hooks : HookList::new(),
        error_handler : None,
        name : std::sync::Mutex::new( None ),
      }
    }

    /// Register a custom error handler invoked after a successful pipeline
    /// run (builder-style).
    #[ must_use ]
    pub fn with_error_handler( mut self, handler : ErrorHandler ) -> Self
    {
      self.error_handler = Some( handler );
      self
    }

    /// Set by the manager when this client is registered under a name.
    pub( crate ) fn set_name( &self, name : String )
    {
      if let Ok( mut guard ) = self.name.lock()
      {
        *guard = Some( name );
      }
    }

    /// The name this client is registered under, if any.
    #[ must_use ]
    pub fn name( &self ) -> Option< String >
    {
      self.name.lock().ok().and_then( |g| g.clone() )
    }

    /// This client's config clone.
    #[ must_use ]
    pub fn config( &self ) -> &Config
    {
      &self.config
    }

    /// Register a middleware (dedup by identity).
    pub async fn add_middleware( &self, middleware : Arc< dyn Middleware > )
    {
      self.middlewares.add( middleware ).await;
    }

    /// Deregister a middleware by id; a no-op if not present.
    pub async fn remove_middleware( &self, id : &str )
    {
      self.middlewares.remove( id ).await;
    }

    /// Register a hook (dedup by identity).
    pub async fn add_hook( &self, hook : Arc< dyn crate::hooks::Hook > )
    {
      self.hooks.add( hook ).await;
    }

    /// Deregister a hook by id; a no-op if not present.
    pub async fn remove_hook( &self, id : &str )
    {
      self.hooks.remove( id ).await;
    }

    /// `GET`
    pub async fn get( &self, endpoint : &str ) -> HttpClientResult< Response >
    {
      self.execute( Method::Get, endpoint, None ).await
    }

    /// `POST`
    pub async fn post( &self, endpoint : &str, body : Body ) -> HttpClientResult< Response >
    {
      self.execute( Method::Post, endpoint, Some( body ) ).await
    }

    /// `PUT`
    pub async fn put( &self, endpoint : &str, body : Body ) -> HttpClientResult< Response >
    {
      self.execute( Method::Put, endpoint, Some( body ) ).await
    }

    /// `DELETE`
    pub async fn delete( &self, endpoint : &str ) -> HttpClientResult< Response >
    {
      self.execute( Method::Delete, endpoint, None ).await
    }

    /// `PATCH`
    pub async fn patch( &self, endpoint : &str, body : Body ) -> HttpClientResult< Response >
    {
      self.execute( Method::Patch, endpoint, Some( body ) ).await
    }

    /// `HEAD`
    pub async fn head( &self, endpoint : &str ) -> HttpClientResult< Response >
    {
      self.execute( Method::Head, endpoint, None ).await
    }

    /// `OPTIONS`
    pub async fn options( &self, endpoint : &str ) -> HttpClientResult< Response >
    {
      self.execute( Method::Options, endpoint, None ).await
    }

    /// §4.9 `Execute` : the six-step pipeline shared by every verb method.
    ///
    /// # Errors
    ///
    /// Returns whatever the first failing hook, middleware, retry loop, or
    /// provider call returns, or the error handler's override.
    pub async fn execute( &self, method : Method, endpoint : &str, body : Option< Body > ) -> HttpClientResult< Response >
    {
      let mut req = Request::new( method, endpoint );
      if let Some( body ) = body
      {
        req = req.with_body( body );
      }
      let mut ctx = RequestContext::with_timeout( req.timeout.unwrap_or( self.config.timeout ) );

      let hooks_snapshot = self.hooks.snapshot().await;
      if let Err( err ) = HookList::run_before( &hooks_snapshot, &mut ctx, &req )
      {
        return Err( err );
      }

      let middleware_snapshot = self.middlewares.snapshot().await;
      let mut outcome = self.run_chain( &middleware_snapshot, 0, &mut ctx, &req ).await;

      HookList::run_after( &hooks_snapshot, &ctx, &req, outcome.as_ref().ok() );

      // §4.9 step 6 : a configured error handler can veto an otherwise
      // successful response. The Go design returns `(resp, err)` so both
      // survive; a `Result<Response, Error>` can only carry one, so the
      // override takes the error path and the response is dropped.
      if let ( Ok( resp ), Some( handler ) ) = ( &outcome, &self.error_handler )
      {
        if let Some( override_err ) = handler( resp )
        {
          outcome = Err( override_err );
        }
      }

      if self.config.auto_unmarshal && !req.skip_unmarshal
      {
        if let Ok( resp ) = &mut outcome
        {
          if let Ok( Structured( value ) ) = Structured::< serde_json::Value >::unmarshal( resp, self.config.unmarshal_strategy )
          {
            resp.unmarshaled = Some( value );
          }
        }
      }

      if let Err( err ) = &outcome
      {
        HookList::run_on_error( &hooks_snapshot, &ctx, &req, err );
      }

      outcome
    }

    fn run_chain< 'a >
    (
      &'a self,
      middlewares : &'a [ Arc< dyn Middleware > ],
      index : usize,
      ctx : &'a mut RequestContext,
      req : &'a Request,
    ) -> Pin< Box< dyn Future< Output = HttpClientResult< Response > > + Send + 'a > >
    {
      Box::pin( async move
      {
        if index < middlewares.len()
        {
          let middleware = middlewares[ index ].clone();
          let next : MiddlewareNext< 'a > = {
            let this = self;
            Arc::new( move |ctx : &'a mut RequestContext, req : &'a Request| -> MiddlewareBoxFuture< 'a, HttpClientResult< Response > >
            {
              this.run_chain( middlewares, index + 1, ctx, req )
            } )
          };
          middleware.call( ctx, req, next ).await
        }
        else
        {
          self.dispatch_terminal( ctx, req ).await
        }
      } )
    }

    async fn dispatch_terminal( &self, ctx : &mut RequestContext, req : &Request ) -> HttpClientResult< Response >
    {
      if self.config.retry_config.max_retries > 0
      {
        let provider = &self.provider;
        crate::retry::with_retry( &self.config.retry_config, ctx, move |ctx| provider.do_request( ctx, req ) ).await
      }
      else
      {
        self.provider.do_request( ctx, req ).await
      }
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use crate::provider::{ MetricsRecorder, ProviderMetrics };
    use std::collections::HashMap;
    use std::time::Duration;

    #[ derive( Debug ) ]
    struct StubProvider
    {
      status : u16,
      metrics : MetricsRecorder,
    }

    impl Provider for StubProvider
    {
      fn name( &self ) -> &str { "stub" }
      fn version( &self ) -> &str { "0.0.0" }
      fn configure( &mut self, _config : &Config ) -> HttpClientResult< () > { Ok( () ) }
      fn set_defaults( &mut self ) {}

      fn do_request< 'a >( &'a self, _ctx : &'a mut RequestContext, _req : &'a Request ) -> crate::provider::ProviderFuture< 'a, HttpClientResult< Response > >
      {
        Box::pin( async move
        {
          self.metrics.record_start();
          self.metrics.record_outcome( self.status < 500, Duration::ZERO );
          Ok( Response::from_parts( self.status, b"{\"ok\":true}".to_vec(), HashMap::new(), Duration::ZERO, "c".to_string() ) )
        } )
      }

      fn is_healthy( &self ) -> bool { true }
      fn get_metrics( &self ) -> ProviderMetrics { self.metrics.snapshot() }
    }

    #[ tokio::test ]
    async fn get_dispatches_through_empty_pipeline()
    {
      let client = Client::new( StubProvider { status : 200, metrics : MetricsRecorder::new() }, Config::default_config() );
      let resp = client.get( "/x" ).await.unwrap();
      assert_eq!( resp.status_code, 200 );
    }

    #[ tokio::test ]
    async fn auto_unmarshal_populates_json_value()
    {
      let client = Client::new( StubProvider { status : 200, metrics : MetricsRecorder::new() }, Config::default_config() );
      let resp = client.get( "/x" ).await.unwrap();
      assert!( resp.unmarshaled.is_some() );
    }

    #[ tokio::test ]
    async fn middleware_runs_around_terminal_call()
    {
      struct Marker( std::sync::Arc< std::sync::atomic::AtomicUsize > );
      impl Middleware for Marker
      {
        fn id( &self ) -> &str { "marker" }
        fn call< 'a >( &'a self, ctx : &'a mut RequestContext, req : &'a Request, next : MiddlewareNext< 'a > ) -> MiddlewareBoxFuture< 'a, HttpClientResult< Response > >
        {
          Box::pin( async move
          {
            self.0.fetch_add( 1, std::sync::atomic::Ordering::SeqCst );
            next( ctx, req ).await
          } )
        }
      }

      let client = Client::new( StubProvider { status : 200, metrics : MetricsRecorder::new() }, Config::default_config() );
      let hits = std::sync::Arc::new( std::sync::atomic::AtomicUsize::new( 0 ) );
      client.add_middleware( std::sync::Arc::new( Marker( hits.clone() ) ) ).await;

      client.get( "/x" ).await.unwrap();
      assert_eq!( hits.load( std::sync::atomic::Ordering::SeqCst ), 1 );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    Client,
    ErrorHandler,
  };
}
