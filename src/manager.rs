//! Named-client registry guaranteeing at-most-once construction (§4.10, I1).

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use std::collections::HashMap;
  use std::sync::Arc;

  use crate::client::Client;
  use crate::config::Config;
  use crate::error::HttpClientResult;
  use crate::provider::Provider;

  /// Process-wide registry of named clients, one [`Provider`] type per
  /// instance. Parameterized over `P` so callers who only ever use a single
  /// transport avoid the allocation and dynamic dispatch of
  /// `Box<dyn Provider>`; [`crate::factory::Factory`] covers the
  /// heterogeneous-provider case on top of the same
  /// `optimize_config_for_reuse` helper.
  pub struct ClientManager< P : Provider >
  {
    entries : tokio::sync::RwLock< HashMap< String, Arc< Client< P > > > >,
    constructor : Arc< dyn Fn( &Config ) -> HttpClientResult< P > + Send + Sync >,
  }

  impl< P : Provider > std::fmt::Debug for ClientManager< P >
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.debug_struct( "ClientManager" ).finish_non_exhaustive()
    }
  }

  impl< P : Provider > ClientManager< P >
  {
    /// Build an empty manager backed by `constructor` for new providers.
    #[ must_use ]
    pub fn new( constructor : impl Fn( &Config ) -> HttpClientResult< P > + Send + Sync + 'static ) -> Self
    {
      Self { entries : tokio::sync::RwLock::new( HashMap::new() ), constructor : Arc::new( constructor ) }
    }

    /// §4.10 `GetOrCreateClient` : double-checked locking so concurrent
    /// callers requesting the same `name` never race a second construction
    /// (I1).
    ///
    /// # Errors
    ///
    /// Returns whatever `constructor` returns on failure, or config
    /// validation failure.
    pub async fn get_or_create( &self, name : &str, config : Config ) -> HttpClientResult< Arc< Client< P > > >
    {
      if let Some( existing ) = self.entries.read().await.get( name )
      {
        return Ok( existing.clone() );
      }

      let mut guard = self.entries.write().await;
      if let Some( existing ) = guard.get( name )
      {
        return Ok( existing.clone() );
      }

      let optimized = optimize_config_for_reuse( &config );
      let provider = ( self.constructor )( &optimized )?;
      let client = Arc::new( Client::new( provider, optimized ) );
      client.set_name( name.to_string() );
      guard.insert( name.to_string(), client.clone() );
      Ok( client )
    }

    /// Drop every entry under the write lock.
    pub async fn shutdown( &self )
    {
      self.entries.write().await.clear();
    }

    /// Number of currently registered clients.
    pub async fn len( &self ) -> usize
    {
      self.entries.read().await.len()
    }

    /// `true` iff no clients are registered.
    pub async fn is_empty( &self ) -> bool
    {
      self.entries.read().await.is_empty()
    }
  }

  /// §4.10 `optimizeConfigForReuse` : clone `config` and raise pool-related
  /// fields to values suitable for a long-lived, shared client.
  #[ must_use ]
  pub fn optimize_config_for_reuse( config : &Config ) -> Config
  {
    let mut optimized = config.validate();
    if optimized.max_idle_conns < 100
    {
      optimized.max_idle_conns = 100;
    }
    if optimized.idle_conn_timeout < std::time::Duration::from_secs( 90 )
    {
      optimized.idle_conn_timeout = std::time::Duration::from_secs( 90 );
    }
    if optimized.tls_handshake_timeout < std::time::Duration::from_secs( 10 )
    {
      optimized.tls_handshake_timeout = std::time::Duration::from_secs( 10 );
    }
    optimized.disable_keep_alives = false;
    optimized
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use crate::provider::{ MetricsRecorder, ProviderMetrics };
    use crate::request::{ Request, RequestContext };
    use crate::response::Response;
    use std::collections::HashMap as StdHashMap;
    use std::sync::atomic::{ AtomicUsize, Ordering };
    use std::time::Duration;

    #[ derive( Debug ) ]
    struct CountingProvider { metrics : MetricsRecorder }

    impl Provider for CountingProvider
    {
      fn name( &self ) -> &str { "counting" }
      fn version( &self ) -> &str { "0.0.0" }
      fn configure( &mut self, _config : &Config ) -> HttpClientResult< () > { Ok( () ) }
      fn set_defaults( &mut self ) {}

      fn do_request< 'a >( &'a self, _ctx : &'a mut RequestContext, _req : &'a Request ) -> crate::provider::ProviderFuture< 'a, HttpClientResult< Response > >
      {
        Box::pin( async move { Ok( Response::from_parts( 200, Vec::new(), StdHashMap::new(), Duration::ZERO, "c".to_string() ) ) } )
      }

      fn is_healthy( &self ) -> bool { true }
      fn get_metrics( &self ) -> ProviderMetrics { self.metrics.snapshot() }
    }

    #[ tokio::test ]
    async fn get_or_create_constructs_once_per_name()
    {
      let construction_count = Arc::new( AtomicUsize::new( 0 ) );
      let construction_count_clone = construction_count.clone();
      let manager = ClientManager::new( move |_config| {
        construction_count_clone.fetch_add( 1, Ordering::SeqCst );
        Ok( CountingProvider { metrics : MetricsRecorder::new() } )
      } );

      let a = manager.get_or_create( "svc", Config::default_config() ).await.unwrap();
      let b = manager.get_or_create( "svc", Config::default_config() ).await.unwrap();

      assert_eq!( construction_count.load( Ordering::SeqCst ), 1 );
      assert!( Arc::ptr_eq( &a, &b ) );
    }

    #[ tokio::test ]
    async fn shutdown_clears_all_entries()
    {
      let manager = ClientManager::new( |_config| Ok( CountingProvider { metrics : MetricsRecorder::new() } ) );
      manager.get_or_create( "svc", Config::default_config() ).await.unwrap();
      assert_eq!( manager.len().await, 1 );
      manager.shutdown().await;
      assert!( manager.is_empty().await );
    }

    #[ test ]
    fn optimize_raises_pool_settings()
    {
      let mut config = Config::default_config();
      config.max_idle_conns = 1;
      config.disable_keep_alives = true;
      let optimized = optimize_config_for_reuse( &config );
      assert!( optimized.max_idle_conns >= 100 );
      assert!( !optimized.disable_keep_alives );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    ClientManager,
    optimize_config_for_reuse,
  };
}
