//! Client and retry configuration : defaults, validation, and cloning.

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use std::collections::HashMap;
  use std::time::Duration;

  use crate::response::Response;
  use crate::error::HttpClientError;

  /// Decides whether another retry attempt should be made given the outcome
  /// of the previous one.
  pub type RetryCondition = std::sync::Arc< dyn Fn( Option< &Response >, Option< &HttpClientError > ) -> bool + Send + Sync >;

  /// Backoff and retry-eligibility configuration for the retry engine (§4.6).
  #[ derive( Clone ) ]
  pub struct RetryConfig
  {
    /// Maximum number of retry attempts after the initial one (>= 0).
    pub max_retries : u32,
    /// Delay before the first retry.
    pub initial_interval : Duration,
    /// Ceiling the backoff delay never exceeds.
    pub max_interval : Duration,
    /// Exponential growth factor applied to the delay each attempt (> 1.0 typical).
    pub multiplier : f64,
    /// Predicate deciding whether to retry given `(response, error)`.
    pub retry_condition : RetryCondition,
  }

  impl std::fmt::Debug for RetryConfig
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.debug_struct( "RetryConfig" )
        .field( "max_retries", &self.max_retries )
        .field( "initial_interval", &self.initial_interval )
        .field( "max_interval", &self.max_interval )
        .field( "multiplier", &self.multiplier )
        .field( "retry_condition", &"<fn>" )
        .finish()
    }
  }

  /// Status codes the default retry condition treats as retryable alongside
  /// the generic 5xx range.
  const DEFAULT_RETRYABLE_STATUSES : [ u16; 4 ] = [ 408, 429, 502, 503 ];

  /// `spec.md` §4.1 `DefaultRetryCondition` : retry if an error is present, or
  /// the status is one of the explicitly retryable codes, or it falls in `5xx`.
  #[ must_use ]
  pub fn default_retry_condition( response : Option< &Response >, error : Option< &HttpClientError > ) -> bool
  {
    if error.is_some()
    {
      return true;
    }
    match response
    {
      Some( resp ) =>
      {
        let status = resp.status_code;
        DEFAULT_RETRYABLE_STATUSES.contains( &status ) || status == 504 || ( 500..600 ).contains( &status )
      }
      None => false,
    }
  }

  impl RetryConfig
  {
    /// `spec.md` §4.1 `DefaultRetryConfig` : 3 retries, 1s initial, 30s max, 2x multiplier.
    #[ must_use ]
    pub fn default_retry_config() -> Self
    {
      Self
      {
        max_retries : 3,
        initial_interval : Duration::from_secs( 1 ),
        max_interval : Duration::from_secs( 30 ),
        multiplier : 2.0,
        retry_condition : std::sync::Arc::new( default_retry_condition ),
      }
    }

    /// Override the maximum retry count.
    #[ must_use ]
    pub fn with_max_retries( mut self, max_retries : u32 ) -> Self
    {
      self.max_retries = max_retries;
      self
    }

    /// Override the initial backoff interval.
    #[ must_use ]
    pub fn with_initial_interval( mut self, interval : Duration ) -> Self
    {
      self.initial_interval = interval;
      self
    }

    /// Override the backoff ceiling.
    #[ must_use ]
    pub fn with_max_interval( mut self, interval : Duration ) -> Self
    {
      self.max_interval = interval;
      self
    }

    /// Override the exponential growth multiplier.
    #[ must_use ]
    pub fn with_multiplier( mut self, multiplier : f64 ) -> Self
    {
      self.multiplier = multiplier;
      self
    }

    /// Override the retry-eligibility predicate.
    #[ must_use ]
    pub fn with_retry_condition( mut self, condition : RetryCondition ) -> Self
    {
      self.retry_condition = condition;
      self
    }
  }

  impl Default for RetryConfig
  {
    fn default() -> Self
    {
      Self::default_retry_config()
    }
  }

  /// Resolved strategy for response decoding in the unmarshaler (§4.2).
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub enum UnmarshalStrategy
  {
    /// Resolve the strategy from the response's content type at call time.
    Auto,
    /// Always decode as JSON.
    Json,
    /// Always decode as XML.
    Xml,
    /// Always copy bytes/UTF-8 verbatim.
    Raw,
  }

  /// Client-wide configuration (§3 `Config`).
  #[ derive( Clone ) ]
  pub struct Config
  {
    /// Base URL requests are resolved against when a request URL has no scheme.
    pub base_url : String,
    /// Default per-request timeout, used when a request does not set its own.
    pub timeout : Duration,
    /// Maximum idle connections a provider's pool keeps open.
    pub max_idle_conns : u32,
    /// How long an idle pooled connection is kept before eviction.
    pub idle_conn_timeout : Duration,
    /// Timeout allotted to the TLS handshake portion of connection setup.
    pub tls_handshake_timeout : Duration,
    /// Disable HTTP keep-alive (connection reuse) entirely.
    pub disable_keep_alives : bool,
    /// Disable automatic request/response compression.
    pub disable_compression : bool,
    /// Skip TLS certificate verification (never enable outside local testing).
    pub insecure_skip_verify : bool,
    /// Headers injected into every request the client sends, unless overridden
    /// by a request-specific header of the same name.
    pub headers : HashMap< String, String >,
    /// Retry policy applied by the pipeline's built-in retry wrapper.
    pub retry_config : RetryConfig,
    /// Attach `X-Trace-ID`/`X-Component` headers to every outbound request.
    pub tracing_enabled : bool,
    /// Maintain per-provider request/latency metrics.
    pub metrics_enabled : bool,
    /// Negotiate HTTP/2 when the transport supports it.
    pub enable_http2 : bool,
    /// Content-encodings accepted and transparently decoded on response bodies.
    pub compression_types : Vec< String >,
    /// Automatically unmarshal responses unless the request opts out.
    pub auto_unmarshal : bool,
    /// Strategy used when `auto_unmarshal` is enabled.
    pub unmarshal_strategy : UnmarshalStrategy,
    /// Allow the batch executor and streaming processor to operate.
    pub streaming_enabled : bool,
    /// Allow the batch executor to operate.
    pub batching_enabled : bool,
    /// Chunk boundary for the batch executor (§4.7).
    pub max_batch_size : usize,
    /// Per-chunk deadline layered over the caller's context.
    pub batch_timeout : Duration,
  }

  impl std::fmt::Debug for Config
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.debug_struct( "Config" )
        .field( "base_url", &self.base_url )
        .field( "timeout", &self.timeout )
        .field( "max_idle_conns", &self.max_idle_conns )
        .field( "idle_conn_timeout", &self.idle_conn_timeout )
        .field( "enable_http2", &self.enable_http2 )
        .field( "auto_unmarshal", &self.auto_unmarshal )
        .field( "streaming_enabled", &self.streaming_enabled )
        .field( "batching_enabled", &self.batching_enabled )
        .field( "max_batch_size", &self.max_batch_size )
        .finish_non_exhaustive()
    }
  }

  impl Config
  {
    /// `spec.md` §4.1 `DefaultConfig` : 30s timeout, 100 idle conns, 90s idle
    /// timeout, 10s TLS handshake, keep-alives and compression on, metrics and
    /// tracing on, default retry policy.
    #[ must_use ]
    pub fn default_config() -> Self
    {
      Self
      {
        base_url : String::new(),
        timeout : Duration::from_secs( 30 ),
        max_idle_conns : 100,
        idle_conn_timeout : Duration::from_secs( 90 ),
        tls_handshake_timeout : Duration::from_secs( 10 ),
        disable_keep_alives : false,
        disable_compression : false,
        insecure_skip_verify : false,
        headers : HashMap::new(),
        retry_config : RetryConfig::default_retry_config(),
        tracing_enabled : true,
        metrics_enabled : true,
        enable_http2 : true,
        compression_types : vec![ "gzip".to_string(), "deflate".to_string() ],
        auto_unmarshal : true,
        unmarshal_strategy : UnmarshalStrategy::Auto,
        streaming_enabled : true,
        batching_enabled : true,
        max_batch_size : 50,
        batch_timeout : Duration::from_secs( 30 ),
      }
    }

    /// Deep-clone : headers map and retry config are copied independently of
    /// `self`, so mutating the clone never affects the original (§5 shared
    /// resource policy).
    #[ must_use ]
    pub fn deep_clone( &self ) -> Self
    {
      self.clone()
    }

    /// `spec.md` §4.1 `Validate` : replace nonpositive durations/counts with
    /// defaults, ensure the header map and retry config are populated.
    #[ must_use ]
    pub fn validate( &self ) -> Self
    {
      let defaults = Self::default_config();
      let mut cfg = self.deep_clone();

      if cfg.timeout.is_zero()
      {
        cfg.timeout = defaults.timeout;
      }
      if cfg.max_idle_conns == 0
      {
        cfg.max_idle_conns = defaults.max_idle_conns;
      }
      if cfg.idle_conn_timeout.is_zero()
      {
        cfg.idle_conn_timeout = defaults.idle_conn_timeout;
      }
      if cfg.tls_handshake_timeout.is_zero()
      {
        cfg.tls_handshake_timeout = defaults.tls_handshake_timeout;
      }
      if cfg.max_batch_size == 0
      {
        cfg.max_batch_size = defaults.max_batch_size;
      }
      if cfg.batch_timeout.is_zero()
      {
        cfg.batch_timeout = defaults.batch_timeout;
      }
      if cfg.retry_config.max_interval.is_zero()
      {
        cfg.retry_config = defaults.retry_config;
      }

      cfg
    }

    /// Set the base URL (builder-style).
    #[ must_use ]
    pub fn with_base_url( mut self, base_url : String ) -> Self
    {
      self.base_url = base_url;
      self
    }

    /// Set the default per-request timeout.
    #[ must_use ]
    pub fn with_timeout( mut self, timeout : Duration ) -> Self
    {
      self.timeout = timeout;
      self
    }

    /// Set the retry policy.
    #[ must_use ]
    pub fn with_retry_config( mut self, retry_config : RetryConfig ) -> Self
    {
      self.retry_config = retry_config;
      self
    }

    /// Insert a default header injected into every outbound request.
    #[ must_use ]
    pub fn with_header( mut self, name : impl Into< String >, value : impl Into< String > ) -> Self
    {
      self.headers.insert( name.into(), value.into() );
      self
    }

    /// Set the maximum idle connections per provider pool.
    #[ must_use ]
    pub fn with_max_idle_conns( mut self, max_idle_conns : u32 ) -> Self
    {
      self.max_idle_conns = max_idle_conns;
      self
    }

    /// Set the idle connection timeout.
    #[ must_use ]
    pub fn with_idle_conn_timeout( mut self, timeout : Duration ) -> Self
    {
      self.idle_conn_timeout = timeout;
      self
    }

    /// Set the batch chunk size.
    #[ must_use ]
    pub fn with_max_batch_size( mut self, size : usize ) -> Self
    {
      self.max_batch_size = size;
      self
    }

    /// Set the unmarshal strategy.
    #[ must_use ]
    pub fn with_unmarshal_strategy( mut self, strategy : UnmarshalStrategy ) -> Self
    {
      self.unmarshal_strategy = strategy;
      self
    }
  }

  impl Default for Config
  {
    fn default() -> Self
    {
      Self::default_config()
    }
  }

  /// Resolve a request URL against a base URL per §3 invariant I6 : a URL
  /// that already carries a scheme is used as-is, otherwise the base URL's
  /// trailing slash and the request URL's leading slash are each trimmed once
  /// and joined with a single `/`.
  #[ must_use ]
  pub fn compose_url( base_url : &str, request_url : &str ) -> String
  {
    if request_url.starts_with( "http://" ) || request_url.starts_with( "https://" )
    {
      return request_url.to_string();
    }
    let trimmed_base = base_url.trim_end_matches( '/' );
    let trimmed_path = request_url.trim_start_matches( '/' );
    format!( "{trimmed_base}/{trimmed_path}" )
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn compose_url_uses_absolute_url_as_is()
    {
      assert_eq!( compose_url( "https://base.example", "https://other.example/x" ), "https://other.example/x" );
    }

    #[ test ]
    fn compose_url_joins_trimmed_halves()
    {
      assert_eq!( compose_url( "https://base.example/", "/v1/things" ), "https://base.example/v1/things" );
      assert_eq!( compose_url( "https://base.example", "v1/things" ), "https://base.example/v1/things" );
    }

    #[ test ]
    fn default_retry_condition_retries_on_error()
    {
      let err = HttpClientError::Transport( "boom".into() );
      assert!( default_retry_condition( None, Some( &err ) ) );
    }

    #[ test ]
    fn default_retry_condition_retries_on_retryable_status()
    {
      let resp = Response::from_parts( 503, Vec::new(), HashMap::new(), Duration::ZERO, "t".into() );
      assert!( default_retry_condition( Some( &resp ), None ) );
      let resp_ok = Response::from_parts( 200, Vec::new(), HashMap::new(), Duration::ZERO, "t".into() );
      assert!( !default_retry_condition( Some( &resp_ok ), None ) );
    }

    #[ test ]
    fn deep_clone_is_independent()
    {
      let original = Config::default_config().with_header( "X-A", "1" );
      let mut clone = original.deep_clone();
      clone.headers.insert( "X-B".to_string(), "2".to_string() );
      assert!( !original.headers.contains_key( "X-B" ) );
    }

    #[ test ]
    fn validate_replaces_nonpositive_fields()
    {
      let mut cfg = Config::default_config();
      cfg.timeout = Duration::ZERO;
      cfg.max_idle_conns = 0;
      let validated = cfg.validate();
      assert_eq!( validated.timeout, Config::default_config().timeout );
      assert_eq!( validated.max_idle_conns, Config::default_config().max_idle_conns );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    RetryConfig,
    RetryCondition,
    Config,
    UnmarshalStrategy,
    default_retry_condition,
    compose_url,
  };
}
