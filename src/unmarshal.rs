//! Content-type-driven response decoding (§4.2).

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use crate::config::UnmarshalStrategy;
  use crate::error::{ HttpClientError, HttpClientResult };
  use crate::response::Response;

  /// The strategy actually applied to a given response, after resolving
  /// `UnmarshalStrategy::Auto` against its content type or leading byte.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub enum ResolvedStrategy
  {
    /// Decode as JSON.
    Json,
    /// Decode as XML.
    Xml,
    /// Copy bytes/UTF-8 verbatim.
    Raw,
  }

  /// §4.2 strategy resolution : honor a non-`Auto` configured strategy
  /// outright; otherwise parse the media type from `content_type`, falling
  /// back to inspecting the first non-whitespace byte of `body` when no
  /// content type is present at all.
  #[ must_use ]
  pub fn resolve_strategy
  (
    configured : UnmarshalStrategy,
    content_type : Option< &str >,
    body : &[ u8 ],
  ) -> ResolvedStrategy
  {
    match configured
    {
      UnmarshalStrategy::Json => return ResolvedStrategy::Json,
      UnmarshalStrategy::Xml => return ResolvedStrategy::Xml,
      UnmarshalStrategy::Raw => return ResolvedStrategy::Raw,
      UnmarshalStrategy::Auto => {}
    }

    match content_type.map( |ct| ct.split( ';' ).next().unwrap_or( ct ).trim().to_ascii_lowercase() )
    {
      Some( media ) if !media.is_empty() =>
      {
        if media.ends_with( "/json" ) || media.ends_with( "+json" )
        {
          ResolvedStrategy::Json
        }
        else if media.ends_with( "/xml" ) || media.ends_with( "+xml" )
        {
          ResolvedStrategy::Xml
        }
        else if media.starts_with( "text/" ) || media == "application/octet-stream"
        {
          ResolvedStrategy::Raw
        }
        else
        {
          ResolvedStrategy::Json
        }
      }
      _ => resolve_from_leading_byte( body ),
    }
  }

  /// Auto mode with no content type at all : inspect the first non-whitespace
  /// byte.
  fn resolve_from_leading_byte( body : &[ u8 ] ) -> ResolvedStrategy
  {
    match body.iter().find( |b| !b.is_ascii_whitespace() )
    {
      Some( b'{' | b'[' ) => ResolvedStrategy::Json,
      Some( b'<' ) => ResolvedStrategy::Xml,
      _ => ResolvedStrategy::Raw,
    }
  }

  /// Newtype wrapper marking a target for JSON/XML decoding, mirroring the
  /// `axum::Json<T>` extractor idiom : this sidesteps the overlapping-impl
  /// problem a blanket `impl<T: DeserializeOwned> Unmarshal for T` would hit
  /// against the concrete `Vec<u8>`/`String` raw-target impls below, since
  /// Rust has no specialization on stable.
  #[ derive( Debug, Clone ) ]
  pub struct Structured< T >( pub T );

  /// A response and a resolved strategy can produce `Self`.
  pub trait Unmarshal : Sized
  {
    /// Decode `response.body` into `Self` under `configured`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpClientError::RequestValidation`] if the body is empty,
    /// or [`HttpClientError::Serialization`] if decoding fails.
    fn unmarshal( response : &Response, configured : UnmarshalStrategy ) -> HttpClientResult< Self >;
  }

  fn content_type_of( response : &Response ) -> Option< &str >
  {
    response.header( "content-type" )
  }

  fn require_non_empty( response : &Response ) -> HttpClientResult< () >
  {
    if response.body.is_empty()
    {
      return Err( HttpClientError::RequestValidation( "cannot unmarshal an empty response body".to_string() ) );
    }
    Ok( () )
  }

  impl< T : serde::de::DeserializeOwned > Unmarshal for Structured< T >
  {
    fn unmarshal( response : &Response, configured : UnmarshalStrategy ) -> HttpClientResult< Self >
    {
      require_non_empty( response )?;
      let strategy = resolve_strategy( configured, content_type_of( response ), &response.body );
      match strategy
      {
        ResolvedStrategy::Json => Ok( Structured( serde_json::from_slice( &response.body )? ) ),
        ResolvedStrategy::Xml => unmarshal_xml( &response.body ).map( Structured ),
        ResolvedStrategy::Raw => Err( HttpClientError::Serialization(
          "raw strategy resolved for a structured target; use String/Vec<u8> or force Json/Xml".to_string()
        ) ),
      }
    }
  }

  impl Unmarshal for Vec< u8 >
  {
    fn unmarshal( response : &Response, configured : UnmarshalStrategy ) -> HttpClientResult< Self >
    {
      require_non_empty( response )?;
      let strategy = resolve_strategy( configured, content_type_of( response ), &response.body );
      match strategy
      {
        ResolvedStrategy::Raw | ResolvedStrategy::Json | ResolvedStrategy::Xml => Ok( response.body.clone() ),
      }
    }
  }

  impl Unmarshal for String
  {
    fn unmarshal( response : &Response, configured : UnmarshalStrategy ) -> HttpClientResult< Self >
    {
      require_non_empty( response )?;
      let strategy = resolve_strategy( configured, content_type_of( response ), &response.body );
      match strategy
      {
        ResolvedStrategy::Raw => Ok( String::from_utf8_lossy( &response.body ).into_owned() ),
        ResolvedStrategy::Json => Ok( serde_json::from_slice( &response.body )? ),
        ResolvedStrategy::Xml => unmarshal_xml( &response.body ),
      }
    }
  }

  #[ cfg( feature = "xml" ) ]
  fn unmarshal_xml< T : serde::de::DeserializeOwned >( body : &[ u8 ] ) -> HttpClientResult< T >
  {
    quick_xml::de::from_reader( body )
      .map_err( |e| HttpClientError::Serialization( format!( "xml decode failed : {e}" ) ) )
  }

  #[ cfg( not( feature = "xml" ) ) ]
  fn unmarshal_xml< T : serde::de::DeserializeOwned >( _body : &[ u8 ] ) -> HttpClientResult< T >
  {
    Err( HttpClientError::Configuration( "xml unmarshal strategy requires the 'xml' feature".to_string() ) )
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn response_with( content_type : Option< &str >, body : &str ) -> Response
    {
      let mut headers = HashMap::new();
      if let Some( ct ) = content_type
      {
        headers.insert( "Content-Type".to_string(), ct.to_string() );
      }
      Response::from_parts( 200, body.as_bytes().to_vec(), headers, Duration::ZERO, "c".to_string() )
    }

    #[ derive( serde::Deserialize, Debug, PartialEq ) ]
    struct Sample { name : String }

    #[ test ]
    fn resolves_json_from_content_type()
    {
      let resp = response_with( Some( "application/json; charset=utf-8" ), r#"{"name":"a"}"# );
      let Structured( sample ) = Structured::< Sample >::unmarshal( &resp, UnmarshalStrategy::Auto ).unwrap();
      assert_eq!( sample, Sample { name : "a".to_string() } );
    }

    #[ test ]
    fn resolves_raw_for_text_plain()
    {
      let resp = response_with( Some( "text/plain" ), "hello" );
      let text = String::unmarshal( &resp, UnmarshalStrategy::Auto ).unwrap();
      assert_eq!( text, "hello" );
    }

    #[ test ]
    fn auto_detects_json_from_leading_brace_without_content_type()
    {
      let resp = response_with( None, r#"{"name":"b"}"# );
      let Structured( sample ) = Structured::< Sample >::unmarshal( &resp, UnmarshalStrategy::Auto ).unwrap();
      assert_eq!( sample.name, "b" );
    }

    #[ test ]
    fn auto_detects_raw_for_plain_text_without_content_type()
    {
      let resp = response_with( None, "plain" );
      let text = String::unmarshal( &resp, UnmarshalStrategy::Auto ).unwrap();
      assert_eq!( text, "plain" );
    }

    #[ test ]
    fn empty_body_fails()
    {
      let resp = response_with( Some( "application/json" ), "" );
      assert!( String::unmarshal( &resp, UnmarshalStrategy::Auto ).is_err() );
    }

    #[ test ]
    fn forced_strategy_overrides_content_type()
    {
      let resp = response_with( Some( "application/json" ), "ignored-content-type" );
      let text = String::unmarshal( &resp, UnmarshalStrategy::Raw ).unwrap();
      assert_eq!( text, "ignored-content-type" );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    ResolvedStrategy,
    Structured,
    Unmarshal,
    resolve_strategy,
  };
}
