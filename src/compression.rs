//! Gzip compression helpers (§3 `compression_types`, §4.9).
//!
//! Request bodies above `min_size` are gzipped before dispatch; response
//! decompression and `Accept-Encoding`/`Content-Encoding` header bookkeeping
//! live here too, independent of which [`crate::provider::Provider`] carries
//! the bytes.

#[ cfg( feature = "compression" ) ]
mod private
{
  use std::io::{ Read, Write };
  use flate2::Compression;
  use flate2::read::GzDecoder;
  use flate2::write::GzEncoder;

  /// Compression configuration
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub struct CompressionConfig
  {
    /// Compression level (0-9, where 0=none, 6=default, 9=best)
    pub level : u32,
    /// Minimum size in bytes before compression is applied
    pub min_size : usize,
  }

  impl CompressionConfig
  {
    /// Create new compression config with default settings
    ///
    /// Default : level=6 (balanced), `min_size=1024` (1KB)
    #[ inline ]
    #[ must_use ]
    pub fn new() -> Self
    {
      Self
      {
        level : 6,
        min_size : 1024,
      }
    }

    /// Set compression level (0-9)
    ///
    /// - 0: No compression
    /// - 1: Fastest compression
    /// - 6: Default balanced compression
    /// - 9: Best compression
    #[ inline ]
    #[ must_use ]
    pub fn with_level( mut self, level : u32 ) -> Self
    {
      self.level = level.min( 9 );
      self
    }

    /// Set minimum size threshold for compression
    ///
    /// Bodies smaller than this size won't be compressed.
    /// Default : 1024 bytes (1KB)
    #[ inline ]
    #[ must_use ]
    pub fn with_min_size( mut self, min_size : usize ) -> Self
    {
      self.min_size = min_size;
      self
    }
  }

  impl Default for CompressionConfig
  {
    #[ inline ]
    fn default() -> Self
    {
      Self::new()
    }
  }

  /// Compress data using gzip
  ///
  /// # Arguments
  ///
  /// * `data` - The data to compress
  /// * `config` - Compression configuration
  ///
  /// # Returns
  ///
  /// Compressed data, or original data if compression would increase size
  ///
  /// # Errors
  ///
  /// Returns an error if compression fails
  #[ inline ]
  pub fn compress( data : &[ u8 ], config : &CompressionConfig ) -> Result< Vec< u8 >, std::io::Error >
  {
    // Skip compression if data is too small
    if data.len() < config.min_size
    {
      return Ok( data.to_vec() );
    }

    let mut encoder = GzEncoder::new( Vec::new(), Compression::new( config.level ) );
    encoder.write_all( data )?;
    let compressed = encoder.finish()?;

    // Only use compressed version if it's actually smaller
    if compressed.len() < data.len()
    {
      Ok( compressed )
    }
    else
    {
      Ok( data.to_vec() )
    }
  }

  /// Decompress gzip-compressed data
  ///
  /// # Arguments
  ///
  /// * `data` - The compressed data
  ///
  /// # Returns
  ///
  /// Decompressed data
  ///
  /// # Errors
  ///
  /// Returns an error if decompression fails or data is corrupted
  #[ inline ]
  pub fn decompress( data : &[ u8 ] ) -> Result< Vec< u8 >, std::io::Error >
  {
    let mut decoder = GzDecoder::new( data );
    let mut decompressed = Vec::new();
    decoder.read_to_end( &mut decompressed )?;
    Ok( decompressed )
  }

  /// Check if data appears to be gzip-compressed
  ///
  /// Checks for gzip magic number (0x1f, 0x8b)
  #[ inline ]
  #[ must_use ]
  pub fn is_gzip( data : &[ u8 ] ) -> bool
  {
    data.len() >= 2 && data[ 0 ] == 0x1f && data[ 1 ] == 0x8b
  }

  /// Add compression headers to a request's header map.
  ///
  /// Adds:
  /// - `Content-Encoding : gzip` if `is_compressed`
  /// - `Accept-Encoding : gzip, deflate` unconditionally
  #[ inline ]
  pub fn add_compression_headers
  (
    headers : &mut std::collections::HashMap< String, String >,
    is_compressed : bool,
  )
  {
    headers.insert( "Accept-Encoding".to_string(), "gzip, deflate".to_string() );

    if is_compressed
    {
      headers.insert( "Content-Encoding".to_string(), "gzip".to_string() );
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn small_bodies_are_not_compressed()
    {
      let config = CompressionConfig::new();
      let result = compress( b"tiny", &config ).unwrap();
      assert_eq!( result, b"tiny" );
    }

    #[ test ]
    fn round_trips_through_gzip()
    {
      let config = CompressionConfig::new().with_min_size( 0 );
      let original = "x".repeat( 2048 );
      let compressed = compress( original.as_bytes(), &config ).unwrap();
      assert!( is_gzip( &compressed ) );
      let decompressed = decompress( &compressed ).unwrap();
      assert_eq!( decompressed, original.as_bytes() );
    }

    #[ test ]
    fn headers_always_advertise_accept_encoding()
    {
      let mut headers = std::collections::HashMap::new();
      add_compression_headers( &mut headers, false );
      assert_eq!( headers.get( "Accept-Encoding" ).unwrap(), "gzip, deflate" );
      assert!( !headers.contains_key( "Content-Encoding" ) );
    }
  }
}

#[ cfg( feature = "compression" ) ]
crate::mod_interface!
{
  exposed use
  {
    CompressionConfig,
    compress,
    decompress,
    is_gzip,
    add_compression_headers,
  };
}
