//! Outbound request representation : method, URL, headers, body, and the
//! per-call cancellation/deadline context.

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use std::collections::HashMap;
  use std::time::Duration;

  /// HTTP method a [`Request`] is dispatched with.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Hash ) ]
  pub enum Method
  {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `DELETE`
    Delete,
    /// `PATCH`
    Patch,
    /// `HEAD`
    Head,
    /// `OPTIONS`
    Options,
  }

  impl Method
  {
    /// The wire representation of this method.
    #[ must_use ]
    pub fn as_str( self ) -> &'static str
    {
      match self
      {
        Self::Get => "GET",
        Self::Post => "POST",
        Self::Put => "PUT",
        Self::Delete => "DELETE",
        Self::Patch => "PATCH",
        Self::Head => "HEAD",
        Self::Options => "OPTIONS",
      }
    }
  }

  impl std::fmt::Display for Method
  {
    fn fmt( &self, f : &mut std::fmt::Formatter< '_ > ) -> std::fmt::Result
    {
      f.write_str( self.as_str() )
    }
  }

  /// A request body, kept as a closed tagged union rather than a dynamically
  /// typed value : callers construct exactly the shape they mean, and the
  /// marshaling step in each provider matches on the variant instead of doing
  /// runtime type reflection.
  #[ derive( Debug, Clone ) ]
  pub enum Body
  {
    /// Pre-encoded bytes, sent as-is.
    Bytes( Vec< u8 > ),
    /// UTF-8 text, sent as-is with a `text/plain` default content type.
    Text( String ),
    /// A JSON value, serialized by the provider at dispatch time.
    Json( serde_json::Value ),
  }

  impl Body
  {
    /// Build a [`Body::Json`] from any `Serialize` value.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::HttpClientError::Serialization`] if `value`
    /// cannot be represented as a [`serde_json::Value`].
    pub fn from_json< T : serde::Serialize >( value : &T ) -> crate::error::HttpClientResult< Self >
    {
      let json = serde_json::to_value( value )?;
      Ok( Self::Json( json ) )
    }

    /// Size in bytes this body will occupy on the wire, without performing
    /// the encoding (JSON bodies are measured by serializing once).
    #[ must_use ]
    pub fn len_hint( &self ) -> usize
    {
      match self
      {
        Self::Bytes( bytes ) => bytes.len(),
        Self::Text( text ) => text.len(),
        Self::Json( value ) => serde_json::to_vec( value ).map( |v| v.len() ).unwrap_or( 0 ),
      }
    }
  }

  /// Per-call cancellation and deadline propagation, independent of any
  /// particular async runtime's context type.
  #[ derive( Debug, Clone ) ]
  pub struct RequestContext
  {
    /// Absolute deadline, if any, derived from a per-request or per-client timeout.
    pub deadline : Option< std::time::Instant >,
    cancel : tokio::sync::watch::Receiver< bool >,
  }

  impl RequestContext
  {
    /// A context with a deadline but no external cancellation source.
    #[ must_use ]
    pub fn with_timeout( timeout : Duration ) -> Self
    {
      let ( _tx, rx ) = tokio::sync::watch::channel( false );
      Self { deadline : Some( std::time::Instant::now() + timeout ), cancel : rx }
    }

    /// Build a context alongside the sender used to cancel it.
    #[ must_use ]
    pub fn with_cancel_handle( timeout : Option< Duration > ) -> ( Self, tokio::sync::watch::Sender< bool > )
    {
      let ( tx, rx ) = tokio::sync::watch::channel( false );
      let deadline = timeout.map( |t| std::time::Instant::now() + t );
      ( Self { deadline, cancel : rx }, tx )
    }

    /// `true` once the deadline has passed or the cancel handle fired.
    #[ must_use ]
    pub fn is_done( &self ) -> bool
    {
      self.is_cancelled() || self.deadline.is_some_and( |d| std::time::Instant::now() >= d )
    }

    /// `true` once the cancel handle fired, independent of the deadline.
    #[ must_use ]
    pub fn is_cancelled( &self ) -> bool
    {
      *self.cancel.borrow()
    }

    /// Await cancellation or the deadline elapsing, whichever comes first.
    /// Resolves immediately if already done.
    pub async fn cancelled( &mut self )
    {
      if self.is_done()
      {
        return;
      }
      match self.deadline
      {
        Some( deadline ) =>
        {
          let remaining = deadline.saturating_duration_since( std::time::Instant::now() );
          tokio::select!
          {
            _ = tokio::time::sleep( remaining ) => {},
            _ = self.cancel.changed() => {},
          }
        }
        None =>
        {
          let _ = self.cancel.changed().await;
        }
      }
    }
  }

  impl Default for RequestContext
  {
    fn default() -> Self
    {
      let ( _tx, rx ) = tokio::sync::watch::channel( false );
      Self { deadline : None, cancel : rx }
    }
  }

  /// A single outbound request (§3 `Request`).
  #[ derive( Debug, Clone ) ]
  pub struct Request
  {
    /// HTTP method.
    pub method : Method,
    /// Absolute URL or path to be composed against the client's base URL.
    pub url : String,
    /// Per-request headers, layered over the client's default headers.
    pub headers : HashMap< String, String >,
    /// Request body, if any.
    pub body : Option< Body >,
    /// Per-request timeout overriding the client default, if set.
    pub timeout : Option< Duration >,
    /// Skip automatic response unmarshaling for this call.
    pub skip_unmarshal : bool,
    /// Correlation id propagated to the response and to trace headers.
    pub trace_id : Option< String >,
  }

  impl Request
  {
    /// Build a request with no body and no headers.
    #[ must_use ]
    pub fn new( method : Method, url : impl Into< String > ) -> Self
    {
      Self
      {
        method,
        url : url.into(),
        headers : HashMap::new(),
        body : None,
        timeout : None,
        skip_unmarshal : false,
        trace_id : None,
      }
    }

    /// Attach a body (builder-style).
    #[ must_use ]
    pub fn with_body( mut self, body : Body ) -> Self
    {
      self.body = Some( body );
      self
    }

    /// Set a header (builder-style).
    #[ must_use ]
    pub fn with_header( mut self, name : impl Into< String >, value : impl Into< String > ) -> Self
    {
      self.headers.insert( name.into(), value.into() );
      self
    }

    /// Override the per-request timeout (builder-style).
    #[ must_use ]
    pub fn with_timeout( mut self, timeout : Duration ) -> Self
    {
      self.timeout = Some( timeout );
      self
    }

    /// Disable automatic unmarshaling for this call (builder-style).
    #[ must_use ]
    pub fn with_skip_unmarshal( mut self ) -> Self
    {
      self.skip_unmarshal = true;
      self
    }

    /// §3 invariant I1 : a request is valid iff it has a method and a
    /// non-empty URL.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::HttpClientError::RequestValidation`] if the
    /// URL is empty.
    pub fn validate( &self ) -> crate::error::HttpClientResult< () >
    {
      if self.url.trim().is_empty()
      {
        return Err( crate::error::HttpClientError::RequestValidation( "request URL is empty".to_string() ) );
      }
      Ok( () )
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn validate_rejects_empty_url()
    {
      let req = Request::new( Method::Get, "" );
      assert!( req.validate().is_err() );
    }

    #[ test ]
    fn builder_methods_compose()
    {
      let req = Request::new( Method::Post, "/x" )
        .with_body( Body::Text( "hi".to_string() ) )
        .with_header( "X-A", "1" )
        .with_timeout( Duration::from_secs( 5 ) );
      assert_eq!( req.headers.get( "X-A" ).map( String::as_str ), Some( "1" ) );
      assert_eq!( req.timeout, Some( Duration::from_secs( 5 ) ) );
    }

    #[ tokio::test ]
    async fn context_cancels_immediately_when_handle_fires()
    {
      let ( mut ctx, tx ) = RequestContext::with_cancel_handle( None );
      tx.send( true ).unwrap();
      ctx.cancelled().await;
      assert!( ctx.is_cancelled() );
    }

    #[ tokio::test ]
    async fn context_times_out_on_deadline()
    {
      let mut ctx = RequestContext::with_timeout( Duration::from_millis( 5 ) );
      ctx.cancelled().await;
      assert!( ctx.is_done() );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    Method,
    Body,
    RequestContext,
    Request,
  };
}
