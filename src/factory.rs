//! Provider-type → constructor registry and configuration optimization (§4.10).

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use std::collections::HashMap;
  use std::sync::Arc;

  use crate::client::Client;
  use crate::config::Config;
  use crate::error::{ HttpClientError, HttpClientResult };
  use crate::manager::optimize_config_for_reuse;
  use crate::provider::Provider;

  /// Identifies which transport a [`Factory`] should build.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Hash ) ]
  pub enum ProviderType
  {
    /// `reqwest`-backed transport.
    Reqwest,
    /// `hyper` + `hyper-rustls`-backed transport.
    Hyper,
    /// A caller-registered provider type identified by a stable id.
    Custom( &'static str ),
  }

  type Constructor = Arc< dyn Fn( &Config ) -> HttpClientResult< Box< dyn Provider > > + Send + Sync >;

  /// Registry mapping [`ProviderType`] to a boxed constructor, producing
  /// ready-to-use [`Client`] instances.
  #[ derive( Default ) ]
  pub struct Factory
  {
    constructors : std::sync::RwLock< HashMap< ProviderType, Constructor > >,
  }

  impl std::fmt::Debug for Factory
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.debug_struct( "Factory" ).finish_non_exhaustive()
    }
  }

  impl Factory
  {
    /// An empty registry.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }

    /// A registry pre-populated with the built-in transports enabled by the
    /// active feature set.
    #[ must_use ]
    pub fn with_builtin_providers() -> Self
    {
      let factory = Self::new();
      #[ cfg( feature = "reqwest-provider" ) ]
      factory.register( ProviderType::Reqwest, |config| {
        crate::provider::ReqwestProvider::new( config ).map( |p| Box::new( p ) as Box< dyn Provider > )
      } );
      #[ cfg( feature = "hyper-provider" ) ]
      factory.register( ProviderType::Hyper, |config| {
        crate::provider::HyperProvider::new( config ).map( |p| Box::new( p ) as Box< dyn Provider > )
      } );
      factory
    }

    /// Register a constructor for `provider_type`. A later call for the same
    /// type replaces the earlier one.
    pub fn register( &self, provider_type : ProviderType, constructor : impl Fn( &Config ) -> HttpClientResult< Box< dyn Provider > > + Send + Sync + 'static )
    {
      if let Ok( mut guard ) = self.constructors.write()
      {
        guard.insert( provider_type, Arc::new( constructor ) );
      }
    }

    /// §4.10 `CreateClient` : resolve the constructor for `provider_type`,
    /// fall back to [`Config::default_config`] when `config` is `None`,
    /// apply `optimizeConfigForReuse`, validate, construct the provider, and
    /// wrap it in a [`Client`].
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::Configuration`] if no constructor is
    /// registered for `provider_type`, otherwise whatever the constructor
    /// returns.
    pub fn create_client( &self, provider_type : ProviderType, config : Option< Config > ) -> HttpClientResult< Client< Box< dyn Provider > > >
    {
      let constructor = self.constructors.read()
        .ok()
        .and_then( |guard| guard.get( &provider_type ).cloned() )
        .ok_or_else( || HttpClientError::Configuration( format!( "no provider constructor registered for {provider_type:?}" ) ) )?;

      let base = config.unwrap_or_else( Config::default_config );
      let optimized = optimize_config_for_reuse( &base );
      let provider = constructor( &optimized )?;
      Ok( Client::new( provider, optimized ) )
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn create_client_fails_for_unregistered_type()
    {
      let factory = Factory::new();
      let result = factory.create_client( ProviderType::Custom( "missing" ), None );
      assert!( result.is_err() );
    }

    #[ cfg( feature = "reqwest-provider" ) ]
    #[ test ]
    fn create_client_uses_default_config_when_none_given()
    {
      let factory = Factory::with_builtin_providers();
      let client = factory.create_client( ProviderType::Reqwest, None ).unwrap();
      assert!( client.config().max_idle_conns >= 100 );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    ProviderType,
    Factory,
  };
}
