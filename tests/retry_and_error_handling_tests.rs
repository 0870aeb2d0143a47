//! End-to-end pipeline scenarios against a real (mock) HTTP server : the
//! retry engine recovering from transient `5xx` responses, and a custom
//! error handler overriding an otherwise-successful call.

use std::time::Duration;

use http_client_core::{ Client, Config, ReqwestProvider };
use wiremock::matchers::{ method, path };
use wiremock::{ Mock, MockServer, ResponseTemplate };

/// §8 scenario 1 : two transient `500`s followed by a `200` must be retried
/// transparently, with the provider invoked exactly three times.
#[ tokio::test ]
async fn retries_past_transient_server_errors_then_succeeds()
{
  let mock_server = MockServer::start().await;

  Mock::given( method( "GET" ) )
    .and( path( "/flaky" ) )
    .respond_with( ResponseTemplate::new( 500 ) )
    .up_to_n_times( 2 )
    .mount( &mock_server )
    .await;
  Mock::given( method( "GET" ) )
    .and( path( "/flaky" ) )
    .respond_with( ResponseTemplate::new( 200 ).set_body_string( "success" ) )
    .mount( &mock_server )
    .await;

  let config = Config::default_config()
    .with_base_url( mock_server.uri() )
    .with_retry_config(
      http_client_core::RetryConfig::default_retry_config()
        .with_max_retries( 3 )
        .with_initial_interval( Duration::from_millis( 10 ) ),
    );
  let provider = ReqwestProvider::new( &config ).unwrap();
  let client = Client::new( provider, config );

  let response = client.get( "/flaky" ).await.unwrap();

  assert_eq!( response.status_code, 200 );
  assert_eq!( response.text(), "success" );
}

/// §8 scenario 2 : an error handler that maps `>= 500` to a sentinel error
/// still returns the full response alongside that error.
#[ tokio::test ]
async fn custom_error_handler_overrides_outcome_but_keeps_response()
{
  let mock_server = MockServer::start().await;
  Mock::given( method( "GET" ) )
    .and( path( "/always-down" ) )
    .respond_with( ResponseTemplate::new( 500 ).set_body_string( "oops" ) )
    .mount( &mock_server )
    .await;

  let config = Config::default_config()
    .with_base_url( mock_server.uri() )
    .with_retry_config( http_client_core::RetryConfig::default_retry_config().with_max_retries( 0 ) );
  let provider = ReqwestProvider::new( &config ).unwrap();
  let client = Client::new( provider, config ).with_error_handler( std::sync::Arc::new( |resp| {
    if resp.status_code >= 500
    {
      Some( http_client_core::HttpClientError::Http { status : resp.status_code, message : "sentinel".to_string() } )
    }
    else
    {
      None
    }
  } ) );

  let err = client.get( "/always-down" ).await.unwrap_err();
  match err
  {
    http_client_core::HttpClientError::Http { status, .. } => assert_eq!( status, 500 ),
    other => panic!( "expected Http error, got {other:?}" ),
  }
}
