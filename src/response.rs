//! Inbound response representation.

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use std::collections::HashMap;
  use std::time::Duration;

  /// A completed HTTP response (§3 `Response`).
  ///
  /// Deliberately carries no back-reference to the [`crate::request::Request`]
  /// that produced it : Rust has no safe weak-pointer idiom for a plain
  /// struct, so correlation is done by [`Response::correlation_id`] instead,
  /// set from the same trace id the tracing middleware stamps as
  /// `X-Trace-ID` on the outbound request.
  #[ derive( Debug, Clone ) ]
  pub struct Response
  {
    /// HTTP status code.
    pub status_code : u16,
    /// Raw response body bytes, prior to any unmarshaling.
    pub body : Vec< u8 >,
    /// Response headers.
    pub headers : HashMap< String, String >,
    /// Wall-clock time spent between dispatch and response headers received.
    pub latency : Duration,
    /// Correlates this response back to the request that produced it.
    pub correlation_id : String,
    /// Lazily-decoded body, populated by the unmarshaler when auto-unmarshal
    /// is enabled and the request didn't opt out.
    pub unmarshaled : Option< serde_json::Value >,
  }

  impl Response
  {
    /// Build a response from its constituent parts.
    #[ must_use ]
    pub fn from_parts
    (
      status_code : u16,
      body : Vec< u8 >,
      headers : HashMap< String, String >,
      latency : Duration,
      correlation_id : String,
    ) -> Self
    {
      Self { status_code, body, headers, latency, correlation_id, unmarshaled : None }
    }

    /// §3 invariant I3 : `true` for any status code outside `[200, 300)`.
    #[ must_use ]
    pub fn is_error( &self ) -> bool
    {
      !( 200..300 ).contains( &self.status_code )
    }

    /// `true` for any status code in `200..300`.
    #[ must_use ]
    pub fn is_success( &self ) -> bool
    {
      ( 200..300 ).contains( &self.status_code )
    }

    /// `true` if a `Content-Encoding` header marks the body as compressed.
    /// Header lookup is case-insensitive per HTTP semantics.
    #[ must_use ]
    pub fn is_compressed( &self ) -> bool
    {
      self.header( "content-encoding" ).is_some()
    }

    /// Case-insensitive header lookup.
    #[ must_use ]
    pub fn header( &self, name : &str ) -> Option< &str >
    {
      self.headers.iter()
        .find( |( k, _ )| k.eq_ignore_ascii_case( name ) )
        .map( |( _, v )| v.as_str() )
    }

    /// The response body interpreted as UTF-8 text, lossily if necessary.
    #[ must_use ]
    pub fn text( &self ) -> String
    {
      String::from_utf8_lossy( &self.body ).into_owned()
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    fn sample( status : u16 ) -> Response
    {
      let mut headers = HashMap::new();
      headers.insert( "Content-Encoding".to_string(), "gzip".to_string() );
      Response::from_parts( status, b"hi".to_vec(), headers, Duration::from_millis( 1 ), "abc".to_string() )
    }

    #[ test ]
    fn is_error_true_outside_2xx()
    {
      assert!( !sample( 200 ).is_error() );
      assert!( !sample( 299 ).is_error() );
      assert!( sample( 301 ).is_error() );
      assert!( sample( 400 ).is_error() );
      assert!( sample( 199 ).is_error() );
    }

    #[ test ]
    fn is_success_only_2xx()
    {
      assert!( sample( 204 ).is_success() );
      assert!( !sample( 301 ).is_success() );
    }

    #[ test ]
    fn header_lookup_is_case_insensitive()
    {
      assert_eq!( sample( 200 ).header( "content-encoding" ), Some( "gzip" ) );
    }

    #[ test ]
    fn is_compressed_reflects_header()
    {
      assert!( sample( 200 ).is_compressed() );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    Response,
  };
}
