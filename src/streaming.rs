//! Streaming response processor : chunked delivery, SSE parsing, and the
//! progress/file/composite/buffered sink adapters (§4.8).
//!
//! Streaming talks to the provider directly, bypassing the middleware chain,
//! consistent with middlewares being synchronous request/response
//! interceptors rather than byte-stream interceptors.

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use std::io::Write;
  use std::sync::{ Arc, Mutex };

  use crate::error::{ HttpClientError, HttpClientResult };

  /// Default chunk size used when partitioning a materialized body (8 KiB).
  pub const DEFAULT_CHUNK_SIZE : usize = 8 * 1024;

  /// Receives a stream of body chunks. Implementations are typically
  /// stateful (an accumulator, a file handle, a progress counter).
  pub trait StreamHandler : Send + Sync
  {
    /// Handle one chunk. An error aborts the stream (§4.8) : it is reported
    /// via [`StreamHandler::on_error`] and [`StreamHandler::on_complete`] is
    /// not called.
    fn on_data( &self, chunk : &[ u8 ] ) -> HttpClientResult< () >;

    /// Called once, either because `on_data` returned an error or because
    /// the response itself had `statusCode >= 400`.
    fn on_error( &self, err : &HttpClientError );

    /// Called exactly once on a normal end of stream.
    fn on_complete( &self );
  }

  /// Drive `handler` over an already-materialized response body, per the
  /// semantics in §4.8 : a `status_code >= 400` short-circuits to
  /// `on_error` without ever calling `on_data`; otherwise the body is
  /// partitioned into `chunk_size`-byte pieces (default
  /// [`DEFAULT_CHUNK_SIZE`]) delivered in order, and `on_complete` fires once
  /// at the end unless some chunk's `on_data` failed.
  pub fn process_stream( handler : &dyn StreamHandler, status_code : u16, body : &[ u8 ], chunk_size : usize )
  {
    if status_code >= 400
    {
      handler.on_error( &HttpClientError::Http { status : status_code, message : "stream response carried an error status".to_string() } );
      return;
    }

    let chunk_size = if chunk_size == 0 { DEFAULT_CHUNK_SIZE } else { chunk_size };

    for chunk in body.chunks( chunk_size )
    {
      if let Err( err ) = handler.on_data( chunk )
      {
        handler.on_error( &err );
        return;
      }
    }

    handler.on_complete();
  }

  /// A parsed Server-Sent Event.
  #[ derive( Debug, Clone, Default, PartialEq, Eq ) ]
  pub struct SseEvent
  {
    /// `id` field, if present.
    pub id : Option< String >,
    /// `event` field, if present.
    pub event : Option< String >,
    /// Concatenated `data` lines, joined with `\n`.
    pub data : String,
    /// `retry` field in milliseconds, if present and parseable.
    pub retry : Option< u64 >,
  }

  /// Splits incoming chunks into [`SseEvent`]s and forwards each to
  /// `on_event`. A blank line terminates an event; lines starting with `:`
  /// are comments and ignored.
  pub struct SseHandler
  {
    buffer : Mutex< String >,
    current : Mutex< SseEvent >,
    on_event : Arc< dyn Fn( SseEvent ) + Send + Sync >,
  }

  impl SseHandler
  {
    /// Build a handler forwarding each completed event to `on_event`.
    #[ must_use ]
    pub fn new( on_event : impl Fn( SseEvent ) + Send + Sync + 'static ) -> Self
    {
      Self { buffer : Mutex::new( String::new() ), current : Mutex::new( SseEvent::default() ), on_event : Arc::new( on_event ) }
    }

    fn handle_line( &self, line : &str )
    {
      if line.is_empty()
      {
        let event = std::mem::take( &mut *self.current.lock().unwrap() );
        ( self.on_event )( event );
        return;
      }
      if line.starts_with( ':' )
      {
        return;
      }
      let ( field, value ) = line.split_once( ':' ).unwrap_or( ( line, "" ) );
      let value = value.strip_prefix( ' ' ).unwrap_or( value );
      let mut current = self.current.lock().unwrap();
      match field
      {
        "id" => current.id = Some( value.to_string() ),
        "event" => current.event = Some( value.to_string() ),
        "retry" => current.retry = value.parse().ok(),
        "data" =>
        {
          if !current.data.is_empty()
          {
            current.data.push( '\n' );
          }
          current.data.push_str( value );
        }
        _ => {}
      }
    }
  }

  impl StreamHandler for SseHandler
  {
    fn on_data( &self, chunk : &[ u8 ] ) -> HttpClientResult< () >
    {
      let text = String::from_utf8_lossy( chunk );
      let mut buffer = self.buffer.lock().unwrap();
      buffer.push_str( &text );

      while let Some( newline_pos ) = buffer.find( '\n' )
      {
        let line = buffer[ ..newline_pos ].trim_end_matches( '\r' ).to_string();
        buffer.drain( ..=newline_pos );
        drop( buffer );
        self.handle_line( &line );
        buffer = self.buffer.lock().unwrap();
      }
      Ok( () )
    }

    fn on_error( &self, _err : &HttpClientError ) {}

    fn on_complete( &self )
    {
      let remainder = std::mem::take( &mut *self.buffer.lock().unwrap() );
      if !remainder.is_empty()
      {
        self.handle_line( remainder.trim_end_matches( '\r' ) );
      }
    }
  }

  /// Forwards each `on_data` call to a plain byte-slice callback.
  pub struct ChunkedHandler
  {
    callback : Arc< dyn Fn( &[ u8 ] ) + Send + Sync >,
  }

  impl ChunkedHandler
  {
    /// Build from a per-chunk callback.
    #[ must_use ]
    pub fn new( callback : impl Fn( &[ u8 ] ) + Send + Sync + 'static ) -> Self
    {
      Self { callback : Arc::new( callback ) }
    }
  }

  impl StreamHandler for ChunkedHandler
  {
    fn on_data( &self, chunk : &[ u8 ] ) -> HttpClientResult< () >
    {
      ( self.callback )( chunk );
      Ok( () )
    }

    fn on_error( &self, _err : &HttpClientError ) {}
    fn on_complete( &self ) {}
  }

  /// Tracks cumulative bytes against a known or estimated total, invoking a
  /// callback with `(processed, total, percentage)`; on completion, emits a
  /// final 100% tick.
  pub struct ProgressHandler
  {
    processed : Mutex< u64 >,
    total : u64,
    callback : Arc< dyn Fn( u64, u64, f64 ) + Send + Sync >,
  }

  impl ProgressHandler
  {
    /// Build from an expected total size and a progress callback.
    #[ must_use ]
    pub fn new( total : u64, callback : impl Fn( u64, u64, f64 ) + Send + Sync + 'static ) -> Self
    {
      Self { processed : Mutex::new( 0 ), total, callback : Arc::new( callback ) }
    }

    fn percentage( &self, processed : u64 ) -> f64
    {
      if self.total == 0 { 0.0 } else { ( processed as f64 / self.total as f64 ) * 100.0 }
    }
  }

  impl StreamHandler for ProgressHandler
  {
    fn on_data( &self, chunk : &[ u8 ] ) -> HttpClientResult< () >
    {
      let mut processed = self.processed.lock().unwrap();
      *processed += chunk.len() as u64;
      ( self.callback )( *processed, self.total, self.percentage( *processed ) );
      Ok( () )
    }

    fn on_error( &self, _err : &HttpClientError ) {}

    fn on_complete( &self )
    {
      let processed = *self.processed.lock().unwrap();
      ( self.callback )( processed, self.total, 100.0 );
    }
  }

  /// Writes each chunk to a byte sink until completion.
  pub struct FileHandler< W : Write + Send >
  {
    sink : Mutex< W >,
  }

  impl< W : Write + Send > FileHandler< W >
  {
    /// Build a handler writing chunks to `sink` in arrival order.
    #[ must_use ]
    pub fn new( sink : W ) -> Self
    {
      Self { sink : Mutex::new( sink ) }
    }
  }

  impl< W : Write + Send > StreamHandler for FileHandler< W >
  {
    fn on_data( &self, chunk : &[ u8 ] ) -> HttpClientResult< () >
    {
      self.sink.lock().unwrap().write_all( chunk )
        .map_err( |e| HttpClientError::Stream( format!( "file sink write failed : {e}" ) ) )
    }

    fn on_error( &self, _err : &HttpClientError ) {}
    fn on_complete( &self ) {}
  }

  /// Fans a single stream out to multiple handlers; the first `on_data`
  /// error from any child aborts the whole composite.
  pub struct CompositeHandler
  {
    children : Vec< Arc< dyn StreamHandler > >,
  }

  impl CompositeHandler
  {
    /// Build from the list of child handlers, invoked in order.
    #[ must_use ]
    pub fn new( children : Vec< Arc< dyn StreamHandler > > ) -> Self
    {
      Self { children }
    }
  }

  impl StreamHandler for CompositeHandler
  {
    fn on_data( &self, chunk : &[ u8 ] ) -> HttpClientResult< () >
    {
      for child in &self.children
      {
        child.on_data( chunk )?;
      }
      Ok( () )
    }

    fn on_error( &self, err : &HttpClientError )
    {
      for child in &self.children
      {
        child.on_error( err );
      }
    }

    fn on_complete( &self )
    {
      for child in &self.children
      {
        child.on_complete();
      }
    }
  }

  /// Accumulates chunks until at least `buffer_size` bytes have arrived,
  /// then flushes the accumulated bytes to an underlying handler as one
  /// chunk; `on_complete` flushes any remainder first.
  pub struct BufferedHandler
  {
    buffer_size : usize,
    pending : Mutex< Vec< u8 > >,
    inner : Arc< dyn StreamHandler >,
  }

  impl BufferedHandler
  {
    /// Build a handler that batches writes to `inner` in `buffer_size`-byte
    /// groups.
    #[ must_use ]
    pub fn new( buffer_size : usize, inner : Arc< dyn StreamHandler > ) -> Self
    {
      Self { buffer_size, pending : Mutex::new( Vec::new() ), inner }
    }
  }

  impl StreamHandler for BufferedHandler
  {
    fn on_data( &self, chunk : &[ u8 ] ) -> HttpClientResult< () >
    {
      let mut pending = self.pending.lock().unwrap();
      pending.extend_from_slice( chunk );
      if pending.len() >= self.buffer_size
      {
        let flushed = std::mem::take( &mut *pending );
        drop( pending );
        return self.inner.on_data( &flushed );
      }
      Ok( () )
    }

    fn on_error( &self, err : &HttpClientError )
    {
      self.inner.on_error( err );
    }

    fn on_complete( &self )
    {
      let remainder = std::mem::take( &mut *self.pending.lock().unwrap() );
      if !remainder.is_empty()
      {
        let _ = self.inner.on_data( &remainder );
      }
      self.inner.on_complete();
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    #[ test ]
    fn error_status_short_circuits_before_any_on_data()
    {
      let calls = Arc::new( AtomicUsize::new( 0 ) );
      let calls_clone = calls.clone();
      let handler = ChunkedHandler::new( move |_| { calls_clone.fetch_add( 1, Ordering::SeqCst ); } );
      process_stream( &handler, 500, b"irrelevant", DEFAULT_CHUNK_SIZE );
      assert_eq!( calls.load( Ordering::SeqCst ), 0 );
    }

    #[ test ]
    fn chunks_body_in_order()
    {
      let seen = Arc::new( Mutex::new( Vec::new() ) );
      let seen_clone = seen.clone();
      let handler = ChunkedHandler::new( move |chunk| seen_clone.lock().unwrap().push( chunk.to_vec() ) );
      process_stream( &handler, 200, b"abcdef", 2 );
      assert_eq!( *seen.lock().unwrap(), vec![ b"ab".to_vec(), b"cd".to_vec(), b"ef".to_vec() ] );
    }

    #[ test ]
    fn sse_parses_multiline_data_and_skips_comments()
    {
      let events = Arc::new( Mutex::new( Vec::new() ) );
      let events_clone = events.clone();
      let handler = SseHandler::new( move |event| events_clone.lock().unwrap().push( event ) );

      let payload = b":comment\nevent: tick\nid: 1\ndata: line one\ndata: line two\n\n";
      process_stream( &handler, 200, payload, DEFAULT_CHUNK_SIZE );

      let parsed = events.lock().unwrap();
      assert_eq!( parsed.len(), 1 );
      assert_eq!( parsed[ 0 ].event.as_deref(), Some( "tick" ) );
      assert_eq!( parsed[ 0 ].data, "line one\nline two" );
    }

    #[ test ]
    fn progress_handler_emits_final_full_tick()
    {
      let last = Arc::new( Mutex::new( 0.0 ) );
      let last_clone = last.clone();
      let handler = ProgressHandler::new( 6, move |_p, _t, pct| *last_clone.lock().unwrap() = pct );
      process_stream( &handler, 200, b"abcdef", 3 );
      assert_eq!( *last.lock().unwrap(), 100.0 );
    }

    #[ test ]
    fn buffered_handler_flushes_at_threshold_and_on_complete()
    {
      let flushes = Arc::new( Mutex::new( Vec::new() ) );
      let flushes_clone = flushes.clone();
      let inner = Arc::new( ChunkedHandler::new( move |c| flushes_clone.lock().unwrap().push( c.to_vec() ) ) );
      let handler = BufferedHandler::new( 4, inner );
      process_stream( &handler, 200, b"abcdefg", 2 );

      let collected = flushes.lock().unwrap();
      assert_eq!( collected.concat(), b"abcdefg".to_vec() );
    }

    #[ test ]
    fn composite_aborts_on_first_child_error()
    {
      struct Failing;
      impl StreamHandler for Failing
      {
        fn on_data( &self, _chunk : &[ u8 ] ) -> HttpClientResult< () >
        {
          Err( HttpClientError::Stream( "nope".to_string() ) )
        }
        fn on_error( &self, _err : &HttpClientError ) {}
        fn on_complete( &self ) {}
      }

      let calls = Arc::new( AtomicUsize::new( 0 ) );
      let calls_clone = calls.clone();
      let ok_handler = Arc::new( ChunkedHandler::new( move |_| { calls_clone.fetch_add( 1, Ordering::SeqCst ); } ) );
      let composite = CompositeHandler::new( vec![ ok_handler, Arc::new( Failing ) ] );

      process_stream( &composite, 200, b"xy", DEFAULT_CHUNK_SIZE );
      assert_eq!( calls.load( Ordering::SeqCst ), 1 );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    DEFAULT_CHUNK_SIZE,
    StreamHandler,
    process_stream,
    SseEvent,
    SseHandler,
    ChunkedHandler,
    ProgressHandler,
    FileHandler,
    CompositeHandler,
    BufferedHandler,
  };
}
