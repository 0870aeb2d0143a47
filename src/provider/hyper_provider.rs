//! `hyper` + `hyper-rustls`-backed transport provider.
//!
//! A second, independently-pooled transport proves the [`Provider`]
//! abstraction is real : nothing in the pipeline (hooks, middleware, retry,
//! batching, streaming) is aware which of the two backs a given client.

use std::time::Instant;

use bytes::Bytes;
use http_body_util::{ BodyExt, Full };
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client as LegacyClient;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use crate::config::Config;
use crate::error::{ HttpClientError, HttpClientResult };
use crate::provider::{ MetricsRecorder, Provider, ProviderMetrics, apply_default_content_type, effective_timeout, trace_headers };
use crate::request::{ Body, Method, Request, RequestContext };
use crate::response::Response;

type HyperClient = LegacyClient< HttpsConnector< HttpConnector >, Full< Bytes > >;

fn build_hyper_client( config : &Config ) -> HttpClientResult< HyperClient >
{
  let https = hyper_rustls::HttpsConnectorBuilder::new()
    .with_native_roots()
    .map_err( |e| HttpClientError::Construction( format!( "tls root store setup failed : {e}" ) ) )?
    .https_or_http()
    .enable_http1();
  let https = if config.enable_http2 { https.enable_http2().build() } else { https.build() };

  let client = LegacyClient::builder( TokioExecutor::new() )
    .pool_idle_timeout( config.idle_conn_timeout )
    .pool_max_idle_per_host( config.max_idle_conns as usize )
    .build( https );

  Ok( client )
}

fn http_method( method : Method ) -> http::Method
{
  match method
  {
    Method::Get => http::Method::GET,
    Method::Post => http::Method::POST,
    Method::Put => http::Method::PUT,
    Method::Delete => http::Method::DELETE,
    Method::Patch => http::Method::PATCH,
    Method::Head => http::Method::HEAD,
    Method::Options => http::Method::OPTIONS,
  }
}

fn body_bytes( body : &Body ) -> HttpClientResult< Vec< u8 > >
{
  match body
  {
    Body::Bytes( bytes ) => Ok( bytes.clone() ),
    Body::Text( text ) => Ok( text.clone().into_bytes() ),
    Body::Json( value ) => serde_json::to_vec( value ).map_err( HttpClientError::from ),
  }
}

/// Transport provider backed by `hyper_util`'s legacy client over
/// `hyper-rustls`. Owns its own connector and connection pool, entirely
/// independent of [`crate::provider::ReqwestProvider`]'s.
#[ derive( Debug ) ]
pub struct HyperProvider
{
  client : HyperClient,
  base_url : String,
  default_headers : std::collections::HashMap< String, String >,
  default_timeout : std::time::Duration,
  metrics : MetricsRecorder,
}

impl HyperProvider
{
  /// Build a provider from `config`, constructing its connector and pool
  /// immediately.
  ///
  /// # Errors
  ///
  /// Returns [`HttpClientError::Construction`] if the TLS root store or
  /// connector cannot be built.
  pub fn new( config : &Config ) -> HttpClientResult< Self >
  {
    Ok( Self
    {
      client : build_hyper_client( config )?,
      base_url : config.base_url.clone(),
      default_headers : config.headers.clone(),
      default_timeout : config.timeout,
      metrics : MetricsRecorder::new(),
    } )
  }
}

impl Provider for HyperProvider
{
  fn name( &self ) -> &str
  {
    "hyper"
  }

  fn version( &self ) -> &str
  {
    env!( "CARGO_PKG_VERSION" )
  }

  fn configure( &mut self, config : &Config ) -> HttpClientResult< () >
  {
    self.client = build_hyper_client( config )?;
    self.base_url = config.base_url.clone();
    self.default_headers = config.headers.clone();
    self.default_timeout = config.timeout;
    Ok( () )
  }

  fn set_defaults( &mut self )
  {
    let defaults = Config::default_config();
    if let Ok( client ) = build_hyper_client( &defaults )
    {
      self.client = client;
    }
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

    let payload = if let Some( body ) = &req.body
    {
      apply_default_content_type( &mut headers, body );
      body_bytes( body )?
    }
    else
    {
      Vec::new()
    };

    if let Some( trace_id ) = &req.trace_id
    {
      headers.insert( "X-Trace-ID".to_string(), trace_id.clone() );
    }
    else
    {
      let ( trace_header, trace_value, _component ) = trace_headers( self.name() );
      headers.insert( trace_header, trace_value );
    }
    headers.insert( "X-Component".to_string(), self.name().to_string() );

    let mut builder = http::Request::builder()
      .method( http_method( req.method ) )
      .uri( &url );
    for ( k, v ) in &headers
    {
      builder = builder.header( k.as_str(), v.as_str() );
    }
    let hyper_req = builder
      .body( Full::new( Bytes::from( payload ) ) )
      .map_err( |e| HttpClientError::RequestValidation( format!( "malformed request : {e}" ) ) )?;

    let timeout = effective_timeout( req, &Config { base_url : self.base_url.clone(), timeout : self.default_timeout, ..Config::default_config() } );
    let send = tokio::time::timeout( timeout, self.client.request( hyper_req ) );

    let outcome = tokio::select!
    {
      result = send => match result
      {
        Ok( Ok( resp ) ) => Ok( resp ),
        Ok( Err( e ) ) => Err( HttpClientError::Transport( format!( "hyper request failed : {e}" ) ) ),
        Err( _elapsed ) => Err( HttpClientError::Transport( format!( "request timed out after {timeout:?}" ) ) ),
      },
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

    let body_bytes_result = resp.into_body().collect().await
      .map_err( |e| HttpClientError::Transport( format!( "failed reading response body : {e}" ) ) );

    let collected = match body_bytes_result
    {
      Ok( collected ) => collected,
      Err( err ) =>
      {
        self.metrics.record_outcome( false, latency );
        return Err( err );
      }
    };

    let raw_body = collected.to_bytes().to_vec();

    #[ cfg( feature = "compression" ) ]
    let body_bytes = if response_headers.iter().any( |( k, v )| k.eq_ignore_ascii_case( "content-encoding" ) && v.eq_ignore_ascii_case( "gzip" ) )
      && crate::compression::is_gzip( &raw_body )
    {
      crate::compression::decompress( &raw_body ).unwrap_or( raw_body )
    }
    else
    {
      raw_body
    };
    #[ cfg( not( feature = "compression" ) ) ]
    let body_bytes = raw_body;

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
    let provider = HyperProvider::new( &config ).unwrap();
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
    let provider = HyperProvider::new( &config ).unwrap();
    let mut ctx = RequestContext::with_timeout( std::time::Duration::from_secs( 5 ) );
    let req = Request::new( Method::Get, "/x" );

    let result = provider.do_request( &mut ctx, &req ).await;
    assert!( result.is_err(), "request should time out at the configured 50ms, not the 30s default" );
  }

  #[ cfg( feature = "compression" ) ]
  #[ tokio::test ]
  async fn gzip_encoded_response_is_decompressed()
  {
    let original = "x".repeat( 2048 );
    let compressed = crate::compression::compress
    (
      original.as_bytes(),
      &crate::compression::CompressionConfig::new().with_min_size( 0 ),
    ).unwrap();

    let mock_server = wiremock::MockServer::start().await;
    wiremock::Mock::given( wiremock::matchers::method( "GET" ) )
      .respond_with
      (
        wiremock::ResponseTemplate::new( 200 )
          .insert_header( "Content-Encoding", "gzip" )
          .set_body_bytes( compressed ),
      )
      .mount( &mock_server )
      .await;

    let config = Config::default_config().with_base_url( mock_server.uri() );
    let provider = HyperProvider::new( &config ).unwrap();
    let mut ctx = RequestContext::with_timeout( std::time::Duration::from_secs( 5 ) );
    let req = Request::new( Method::Get, "/x" );

    let resp = provider.do_request( &mut ctx, &req ).await.unwrap();
    assert_eq!( resp.body, original.as_bytes() );
  }
}
