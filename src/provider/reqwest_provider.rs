//! `reqwest`-backed transport provider.

use std::time::Instant;

use crate::config::Config;
use crate::error::{ HttpClientError, HttpClientResult };
use crate::provider::{ MetricsRecorder, Provider, ProviderMetrics, apply_default_content_type, effective_timeout, trace_headers };
use crate::request::{ Body, Method, Request, RequestContext };
use crate::response::Response;

fn reqwest_method( method : Method ) -> reqwest::Method
{
  match method
  {
    Method::Get => reqwest::Method::GET,
    Method::Post => reqwest::Method::POST,
    Method::Put => reqwest::Method::PUT,
    Method::Delete => reqwest::Method::DELETE,
    Method::Patch => reqwest::Method::PATCH,
    Method::Head => reqwest::Method::HEAD,
    Method::Options => reqwest::Method::OPTIONS,
  }
}

fn build_reqwest_client( config : &Config ) -> HttpClientResult< reqwest::Client >
{
  let mut builder = reqwest::Client::builder()
    .pool_max_idle_per_host( config.max_idle_conns as usize )
    .pool_idle_timeout( config.idle_conn_timeout )
    .connect_timeout( config.tls_handshake_timeout )
    .timeout( config.timeout );

  if config.disable_keep_alives
  {
    builder = builder.pool_max_idle_per_host( 0 );
  }
  if config.disable_compression
  {
    builder = builder.no_gzip().no_deflate().no_brotli();
  }
  if config.insecure_skip_verify
  {
    builder = builder.danger_accept_invalid_certs( true );
  }
  if !config.enable_http2
  {
    builder = builder.http1_only();
  }

  builder.build().map_err( |e| HttpClientError::Construction( format!( "reqwest client build failed : {e}" ) ) )
}

/// Transport provider backed by [`reqwest::Client`]. Owns a single pooled
/// client for the provider's lifetime; `configure` rebuilds the pool.
#[ derive( Debug ) ]
pub struct ReqwestProvider
{
  client : reqwest::Client,
  base_url : String,
  default_headers : std::collections::HashMap< String, String >,
  default_timeout : std::time::Duration,
  metrics : MetricsRecorder,
}

impl ReqwestProvider
{
  /// Build a provider from `config`, constructing its pool immediately.
  ///
  /// # Errors
  ///
  /// Returns [`HttpClientError::Construction`] if the underlying `reqwest`
  /// client cannot be built (e.g. an invalid TLS configuration).
  pub fn new( config : &Config ) -> HttpClientResult< Self >
  {
    Ok( Self
    {
      client : build_reqwest_client( config )?,
      base_url : config.base_url.clone(),
      default_headers : config.headers.clone(),
      default_timeout : config.timeout,
      metrics : MetricsRecorder::new(),
    } )
  }
}

impl Provider for ReqwestProvider
{
  fn name( &self ) -> &str
  {
    "reqwest"
  }

  fn version( &self ) -> &str
  {
    env!( "CARGO_PKG_VERSION" )
  }

  fn configure( &mut self, config : &Config ) -> HttpClientResult< () >
  {
    self.client = build_reqwest_client( config )?;
    self.base_url = config.base_url.clone();
    self.default_headers = config.headers.clone();
    self.default_timeout = config.timeout;
    Ok( () )
  }

  fn set_defaults( &mut self )
  {
    let defaults = Config::default_config();
    self.client = build_reqwest_client( &defaults ).unwrap_or_else( |_| reqwest::Client::new() );
    self.default_headers = defaults.headers;
    self.default_timeout = defaults.timeout;
  }

  fn do_request< 'a >( &'a self, ctx : &'a mut RequestContext, req : &'a Request ) -> crate::provider::ProviderFuture< 'a, HttpClientResult< Response > >
  {
    Box::pin( async move
    {
    req.validate()?;
    self.metrics.record_start();
    let started = Instant::now();

    let url = crate::config::compose_url( &self.base_url, &req.url );

    let mut headers = self.default_headers.clone();
    for ( k, v ) in &req.headers
    {
      headers.insert( k.clone(), v.clone() );
    }

    let mut builder = self.client.request( reqwest_method( req.method ), &url );

    if let Some( body ) = &req.body
    {
      apply_default_content_type( &mut headers, body );
      builder = match body
      {
        Body::Bytes( bytes ) => builder.body( bytes.clone() ),
        Body::Text( text ) => builder.body( text.clone() ),
        Body::Json( value ) => builder.body(
          serde_json::to_vec( value ).map_err( HttpClientError::from )?
        ),
      };
    }

    if let Some( trace_id ) = &req.trace_id
    {
      headers.insert( "X-Trace-ID".to_string(), trace_id.clone() );
      headers.insert( "X-Component".to_string(), self.name().to_string() );
    }
    else
    {
      let ( trace_header, trace_value, component ) = trace_headers( self.name() );
      headers.insert( trace_header, trace_value );
      headers.insert( "X-Component".to_string(), component );
    }

    for ( k, v ) in &headers
    {
      builder = builder.header( k, v );
    }

    let timeout = effective_timeout( req, &Config { base_url : self.base_url.clone(), timeout : self.default_timeout, ..Config::default_config() } );
    builder = builder.timeout( timeout );

    let send = builder.send();
    let outcome = tokio::select!
    {
      result = send => result.map_err( HttpClientError::from ),
      () = ctx.cancelled() => Err( HttpClientError::Cancelled ),
    };

    let latency = started.elapsed();

    let resp = match outcome
    {
      Ok( resp ) => resp,
      Err( err ) =>
      {
        self.metrics.record_outcome( false, latency );
        return Err( err );
      }
    };

    let status_code = resp.status().as_u16();
    let mut response_headers = std::collections::HashMap::new();
    for ( name, value ) in resp.headers()
    {
      if let Ok( v ) = value.to_str()
      {
        response_headers.insert( name.to_string(), v.to_string() );
      }
    }
    let correlation_id = headers.get( "X-Trace-ID" ).cloned().unwrap_or_default();
    let body_bytes = resp.bytes().await.map_err( HttpClientError::from )?.to_vec();

    self.metrics.record_outcome( status_code < 500, latency );

    Ok( Response::from_parts( status_code, body_bytes, response_headers, latency, correlation_id ) )
    } )
  }

  fn is_healthy( &self ) -> bool
  {
    true
  }

  fn get_metrics( &self ) -> ProviderMetrics
  {
    self.metrics.snapshot()
  }
}

#[ cfg( test ) ]
mod tests
{
  use super::*;

  #[ tokio::test ]
  async fn request_against_mock_server_round_trips()
  {
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given( wiremock::matchers::method( "GET" ) )
      .and( wiremock::matchers::path( "/v1/ping" ) )
      .respond_with( wiremock::ResponseTemplate::new( 200 ).set_body_string( "pong" ) )
      .mount( &mock_server )
      .await;

    let config = Config::default_config().with_base_url( mock_server.uri() );
    let provider = ReqwestProvider::new( &config ).unwrap();
    let mut ctx = RequestContext::with_timeout( std::time::Duration::from_secs( 5 ) );
    let req = Request::new( Method::Get, "/v1/ping" );

    let resp = provider.do_request( &mut ctx, &req ).await.unwrap();
    assert_eq!( resp.status_code, 200 );
    assert_eq!( resp.text(), "pong" );
  }

  #[ tokio::test ]
  async fn request_level_timeout_uses_configured_value_not_default()
  {
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given( wiremock::matchers::method( "GET" ) )
      .respond_with( wiremock::ResponseTemplate::new( 200 ).set_delay( std::time::Duration::from_millis( 200 ) ) )
      .mount( &mock_server )
      .await;

    let config = Config::default_config()
      .with_base_url( mock_server.uri() )
      .with_timeout( std::time::Duration::from_millis( 50 ) );
    let provider = ReqwestProvider::new( &config ).unwrap();
    let mut ctx = RequestContext::with_timeout( std::time::Duration::from_secs( 5 ) );
    let req = Request::new( Method::Get, "/x" );

    let result = provider.do_request( &mut ctx, &req ).await;
    assert!( result.is_err(), "request should time out at the configured 50ms, not the 30s default" );
  }

  #[ tokio::test ]
  async fn metrics_track_requests()
  {
    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given( wiremock::matchers::method( "GET" ) )
      .respond_with( wiremock::ResponseTemplate::new( 200 ) )
      .mount( &mock_server )
      .await;

    let config = Config::default_config().with_base_url( mock_server.uri() );
    let provider = ReqwestProvider::new( &config ).unwrap();
    let mut ctx = RequestContext::with_timeout( std::time::Duration::from_secs( 5 ) );
    provider.do_request( &mut ctx, &Request::new( Method::Get, "/x" ) ).await.unwrap();

    let metrics = provider.get_metrics();
    assert_eq!( metrics.total_requests, 1 );
    assert_eq!( metrics.successful_requests, 1 );
  }
}
