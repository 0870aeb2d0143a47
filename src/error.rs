//! Error taxonomy for the HTTP client core.
//!
//! Every failure category in the design is represented by one variant so that
//! callers can match on cause without parsing message strings. Construction
//! helpers wrap the failing component's name into the message, per the
//! "every failure is wrapped with enough context to identify the failing
//! component" propagation policy.

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use error_tools::dependency::thiserror;

  /// Errors produced anywhere in the request pipeline.
  #[ derive( Debug, Clone, thiserror::Error ) ]
  pub enum HttpClientError
  {
    /// Nil/invalid configuration where a non-nil one was required, an unknown
    /// provider type, or a nil constructor registration.
    #[ error( "configuration error : {0}" ) ]
    Configuration( String ),
    /// A provider constructor failed (pool setup, TLS setup, etc).
    #[ error( "provider construction failed : {0}" ) ]
    Construction( String ),
    /// The request itself was invalid : nil request, unsupported method, bad URL.
    #[ error( "request cannot be processed : {0}" ) ]
    RequestValidation( String ),
    /// The request body could not be encoded.
    #[ error( "body serialization failed : {0}" ) ]
    Serialization( String ),
    /// A network-level failure : DNS, connection refused, TLS handshake, timeout
    /// before first byte, or a read/write failure mid-flight.
    #[ error( "transport error : {0}" ) ]
    Transport( String ),
    /// A response outside the unmarshal target's expectations (used by the
    /// unmarshaler and by an explicit error handler, never raised implicitly
    /// for a non-2xx status).
    #[ error( "http {status} error : {message}" ) ]
    Http
    {
      /// HTTP status code that triggered this error.
      status : u16,
      /// Human-readable detail.
      message : String,
    },
    /// The caller's context was canceled or its deadline elapsed.
    #[ error( "request canceled" ) ]
    Cancelled,
    /// A batch request failed at the given index; the partial response array
    /// is still returned to the caller alongside this error.
    #[ error( "batch request {index} failed : {source}" ) ]
    Batch
    {
      /// Zero-based index of the first failing request in the batch.
      index : usize,
      /// The underlying cause.
      #[ source ]
      source : Box< HttpClientError >,
    },
    /// A fail-fast batch stopped early because of a non-transport HTTP error.
    #[ error( "fail-fast batch stopped at request {index} : status {status}" ) ]
    BatchFailFast
    {
      /// Zero-based index of the request that tripped fail-fast.
      index : usize,
      /// Status code observed.
      status : u16,
    },
    /// An error surfaced through a `StreamHandler::on_error` callback.
    #[ error( "stream error : {0}" ) ]
    Stream( String ),
    /// Internal invariant violation; should not occur in correct usage.
    #[ error( "internal error : {0}" ) ]
    Internal( String ),
  }

  impl HttpClientError
  {
    /// Build a [`HttpClientError::Batch`] naming the failing index.
    #[ must_use ]
    pub fn batch_at( index : usize, source : HttpClientError ) -> Self
    {
      Self::Batch { index, source : Box::new( source ) }
    }

    /// `true` if this error represents an HTTP response with `status_code >= 400`.
    #[ must_use ]
    pub fn is_http_error( &self ) -> bool
    {
      matches!( self, Self::Http { .. } | Self::BatchFailFast { .. } )
    }
  }

  #[ cfg( feature = "reqwest-provider" ) ]
  impl From< reqwest::Error > for HttpClientError
  {
    fn from( err : reqwest::Error ) -> Self
    {
      if err.is_timeout() || err.is_connect()
      {
        Self::Transport( format!( "connection failed : {err}" ) )
      }
      else
      {
        Self::Transport( err.to_string() )
      }
    }
  }

  impl From< serde_json::Error > for HttpClientError
  {
    fn from( err : serde_json::Error ) -> Self
    {
      Self::Serialization( err.to_string() )
    }
  }

  /// Convenience alias used throughout the crate.
  pub type HttpClientResult< T > = Result< T, HttpClientError >;
}

crate::mod_interface!
{
  exposed use
  {
    HttpClientError,
    HttpClientResult,
  };
}
