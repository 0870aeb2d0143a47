//! Lifecycle callbacks : before-request, after-response, on-error (§4.5).

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use std::sync::Arc;

  use crate::error::{ HttpClientError, HttpClientResult };
  use crate::request::{ Request, RequestContext };
  use crate::response::Response;

  /// A single hook implementation, identity-keyed like [`crate::middleware::Middleware`].
  pub trait Hook : Send + Sync
  {
    /// Identity used by [`HookList::remove`].
    fn id( &self ) -> &str;

    /// Invoked in registration order before the middleware chain. Returning
    /// an error aborts the call before the chain is entered.
    fn before_request( &self, _ctx : &mut RequestContext, _req : &Request ) -> HttpClientResult< () >
    {
      Ok( () )
    }

    /// Invoked in registration order after the chain completes, whether or
    /// not it produced an error. Its return value is ignored.
    fn after_response( &self, _ctx : &RequestContext, _req : &Request, _resp : Option< &Response > ) {}

    /// May be invoked by a provider on a transport failure. Not guaranteed
    /// to be called by the core pipeline itself.
    fn on_error( &self, _ctx : &RequestContext, _req : &Request, _err : &HttpClientError ) {}
  }

  /// Ordered, identity-deduplicated, RwLock-guarded hook list.
  #[ derive( Default ) ]
  pub struct HookList
  {
    entries : tokio::sync::RwLock< Vec< Arc< dyn Hook > > >,
  }

  impl std::fmt::Debug for HookList
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.debug_struct( "HookList" ).finish_non_exhaustive()
    }
  }

  impl HookList
  {
    /// An empty hook list.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// Append `hook`, unless one with the same [`Hook::id`] is already present.
    pub async fn add( &self, hook : Arc< dyn Hook > )
    {
      let mut guard = self.entries.write().await;
      if !guard.iter().any( |h| h.id() == hook.id() )
      {
        guard.push( hook );
      }
    }

    /// Remove the hook with the given id; a no-op if not present.
    pub async fn remove( &self, id : &str )
    {
      let mut guard = self.entries.write().await;
      guard.retain( |h| h.id() != id );
    }

    /// Snapshot the current list under the read lock, then release it.
    pub async fn snapshot( &self ) -> Vec< Arc< dyn Hook > >
    {
      self.entries.read().await.clone()
    }

    /// Run every hook's `before_request` in registration order; stop and
    /// return the first error encountered.
    pub fn run_before( snapshot : &[ Arc< dyn Hook > ], ctx : &mut RequestContext, req : &Request ) -> HttpClientResult< () >
    {
      for hook in snapshot
      {
        hook.before_request( ctx, req )?;
      }
      Ok( () )
    }

    /// Run every hook's `after_response` in registration order. Always
    /// invoked, even when the call failed; `resp` is `None` in that case.
    pub fn run_after( snapshot : &[ Arc< dyn Hook > ], ctx : &RequestContext, req : &Request, resp : Option< &Response > )
    {
      for hook in snapshot
      {
        hook.after_response( ctx, req, resp );
      }
    }

    /// Run every hook's `on_error` in registration order.
    pub fn run_on_error( snapshot : &[ Arc< dyn Hook > ], ctx : &RequestContext, req : &Request, err : &HttpClientError )
    {
      for hook in snapshot
      {
        hook.on_error( ctx, req, err );
      }
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use crate::request::Method;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    struct CountingHook { id : String, count : Arc< AtomicUsize > }

    impl Hook for CountingHook
    {
      fn id( &self ) -> &str { &self.id }

      fn before_request( &self, _ctx : &mut RequestContext, _req : &Request ) -> HttpClientResult< () >
      {
        self.count.fetch_add( 1, Ordering::SeqCst );
        Ok( () )
      }
    }

    struct RejectingHook { id : String }

    impl Hook for RejectingHook
    {
      fn id( &self ) -> &str { &self.id }

      fn before_request( &self, _ctx : &mut RequestContext, _req : &Request ) -> HttpClientResult< () >
      {
        Err( HttpClientError::RequestValidation( "rejected".to_string() ) )
      }
    }

    #[ tokio::test ]
    async fn before_request_runs_in_registration_order_and_short_circuits()
    {
      let list = HookList::new();
      let count = Arc::new( AtomicUsize::new( 0 ) );
      list.add( Arc::new( CountingHook { id : "a".to_string(), count : count.clone() } ) ).await;
      list.add( Arc::new( RejectingHook { id : "b".to_string() } ) ).await;
      list.add( Arc::new( CountingHook { id : "c".to_string(), count : count.clone() } ) ).await;

      let snapshot = list.snapshot().await;
      let mut ctx = RequestContext::default();
      let req = Request::new( Method::Get, "/x" );
      let result = HookList::run_before( &snapshot, &mut ctx, &req );

      assert!( result.is_err() );
      assert_eq!( count.load( Ordering::SeqCst ), 1 );
    }

    #[ tokio::test ]
    async fn add_dedups_by_id()
    {
      let list = HookList::new();
      let count = Arc::new( AtomicUsize::new( 0 ) );
      list.add( Arc::new( CountingHook { id : "a".to_string(), count : count.clone() } ) ).await;
      list.add( Arc::new( CountingHook { id : "a".to_string(), count } ) ).await;
      assert_eq!( list.snapshot().await.len(), 1 );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    Hook,
    HookList,
  };
}
