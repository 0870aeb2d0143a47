//! Batch executor : request partitioning across three dispatch strategies
//! with aggregate result accounting (§4.7).

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use std::sync::Arc;
  use std::time::Duration;

  use crate::error::{ HttpClientError, HttpClientResult };
  use crate::request::{ Request, RequestContext };
  use crate::response::Response;

  /// How a batch's requests are dispatched.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub enum BatchStrategy
  {
    /// Dispatch one at a time; stop and report the first error's index.
    Sequential,
    /// Dispatch an entire chunk concurrently under a semaphore.
    Parallel,
    /// Dispatch sequentially; stop at the first transport error or the first
    /// `statusCode >= 400` response.
    FailFast,
  }

  /// Batch executor configuration.
  #[ derive( Debug, Clone ) ]
  pub struct BatchConfig
  {
    /// Chunking boundary; requests beyond this size are split across chunks.
    pub max_batch_size : usize,
    /// Per-chunk deadline, layered over the caller's context.
    pub batch_timeout : Duration,
    /// Semaphore permits for [`BatchStrategy::Parallel`]; `0` means the
    /// default of 10.
    pub max_concurrency : usize,
    /// Reserved : no core code path currently consults this field. Carried
    /// because its intended semantics were never pinned down upstream;
    /// kept present rather than silently dropped so a caller who sets it
    /// isn't misled into thinking it has no storage at all.
    pub failure_threshold : Option< u32 >,
    /// Dispatch strategy.
    pub strategy : BatchStrategy,
  }

  impl BatchConfig
  {
    /// Sequential dispatch, chunk size 50, 30s per-chunk timeout.
    #[ must_use ]
    pub fn default_config() -> Self
    {
      Self
      {
        max_batch_size : 50,
        batch_timeout : Duration::from_secs( 30 ),
        max_concurrency : 10,
        failure_threshold : None,
        strategy : BatchStrategy::Sequential,
      }
    }

    /// Resolved concurrency : `max_concurrency` if nonzero, else the default of 10.
    #[ must_use ]
    pub fn effective_concurrency( &self ) -> usize
    {
      if self.max_concurrency == 0 { 10 } else { self.max_concurrency }
    }
  }

  impl Default for BatchConfig
  {
    fn default() -> Self
    {
      Self::default_config()
    }
  }

  /// Aggregate outcome of a batch run.
  #[ derive( Debug, Default ) ]
  pub struct BatchResult
  {
    /// Per-request response, in input order; `None` at indices that failed.
    pub responses : Vec< Option< Response > >,
    /// Per-chunk errors encountered, each naming the index that triggered it.
    pub chunk_errors : Vec< HttpClientError >,
    /// Total number of requests in the batch.
    pub total_count : usize,
    /// Requests that produced a response with `statusCode < 400`.
    pub success_count : usize,
    /// Requests that failed transport-level or produced `statusCode >= 400`.
    pub failure_count : usize,
    /// The first error encountered, if any; mirrors what the caller receives
    /// as the batch's `Err` when the batch as a whole is considered failed.
    pub final_error : Option< HttpClientError >,
  }

  impl BatchResult
  {
    /// `true` iff there is no final error and no individual failures.
    #[ must_use ]
    pub fn is_success( &self ) -> bool
    {
      self.final_error.is_none() && self.failure_count == 0
    }

    /// `successCount / totalCount`, `0.0` when the batch was empty.
    #[ must_use ]
    pub fn success_rate( &self ) -> f64
    {
      if self.total_count == 0 { 0.0 } else { self.success_count as f64 / self.total_count as f64 }
    }

    /// `failureCount / totalCount`, `0.0` when the batch was empty.
    #[ must_use ]
    pub fn failure_rate( &self ) -> f64
    {
      if self.total_count == 0 { 0.0 } else { self.failure_count as f64 / self.total_count as f64 }
    }
  }

  fn chunk_requests( requests : &[ Request ], max_batch_size : usize ) -> Vec< &[ Request ] >
  {
    if requests.len() <= max_batch_size || max_batch_size == 0
    {
      return vec![ requests ];
    }
    requests.chunks( max_batch_size ).collect()
  }

  fn is_response_success( response : &Response ) -> bool
  {
    !response.is_error() && response.status_code < 400
  }

  /// Dispatch function signature a caller supplies to [`execute_batch`] :
  /// typically a client's `Execute` closed over its provider, middleware, and
  /// retry configuration.
  pub type Dispatch< 'a > = dyn Fn( &'a mut RequestContext, &'a Request ) -> std::pin::Pin< Box< dyn std::future::Future< Output = HttpClientResult< Response > > + Send + 'a > > + Send + Sync + 'a;

  /// Run `requests` through `dispatch` under `config`'s strategy, chunking,
  /// and concurrency limits (§4.7).
  pub async fn execute_batch
  (
    config : &BatchConfig,
    ctx : &mut RequestContext,
    requests : &[ Request ],
    dispatch : Arc< Dispatch< '_ > >,
  ) -> BatchResult
  {
    let mut result = BatchResult { total_count : requests.len(), ..BatchResult::default() };
    result.responses = vec![ None; requests.len() ];

    let chunks = chunk_requests( requests, config.max_batch_size );
    let mut offset = 0usize;

    for chunk in chunks
    {
      match config.strategy
      {
        BatchStrategy::Sequential => run_sequential( ctx, chunk, offset, &dispatch, &mut result, false ).await,
        BatchStrategy::FailFast => run_sequential( ctx, chunk, offset, &dispatch, &mut result, true ).await,
        BatchStrategy::Parallel => run_parallel( ctx, chunk, offset, &dispatch, config.effective_concurrency(), &mut result ).await,
      }

      offset += chunk.len();

      if result.final_error.is_some()
      {
        break;
      }
    }

    result
  }

  async fn run_sequential
  (
    ctx : &mut RequestContext,
    chunk : &[ Request ],
    offset : usize,
    dispatch : &Arc< Dispatch< '_ > >,
    result : &mut BatchResult,
    fail_fast : bool,
  )
  {
    for ( i, req ) in chunk.iter().enumerate()
    {
      let index = offset + i;
      match dispatch( ctx, req ).await
      {
        Ok( resp ) =>
        {
          let success = is_response_success( &resp );
          if success { result.success_count += 1; } else { result.failure_count += 1; }

          if fail_fast && !success
          {
            let status = resp.status_code;
            result.responses[ index ] = Some( resp );
            result.final_error = Some( HttpClientError::BatchFailFast { index, status } );
            return;
          }

          result.responses[ index ] = Some( resp );
        }
        Err( err ) =>
        {
          result.failure_count += 1;
          let wrapped = HttpClientError::batch_at( index, err );
          if result.final_error.is_none()
          {
            result.final_error = Some( wrapped.clone() );
          }
          result.chunk_errors.push( wrapped );
          if fail_fast
          {
            return;
          }
        }
      }
    }
  }

  async fn run_parallel
  (
    ctx : &mut RequestContext,
    chunk : &[ Request ],
    offset : usize,
    dispatch : &Arc< Dispatch< '_ > >,
    max_concurrency : usize,
    result : &mut BatchResult,
  )
  {
    let semaphore = Arc::new( tokio::sync::Semaphore::new( max_concurrency ) );
    let mut outcomes : Vec< ( usize, HttpClientResult< Response > ) > = Vec::with_capacity( chunk.len() );

    // Requests within a chunk share the caller's deadline but not a single
    // mutable context (that can't be split across concurrent tasks); each
    // dispatch gets its own clone of the cancellation/deadline state.
    let mut futures = futures_util::stream::FuturesUnordered::new();
    for ( i, req ) in chunk.iter().enumerate()
    {
      let permit_fut = semaphore.clone().acquire_owned();
      let dispatch = dispatch.clone();
      let mut ctx_clone = ctx.clone();
      let index = offset + i;
      futures.push( async move
      {
        let _permit = permit_fut.await.expect( "semaphore is never closed" );
        let outcome = dispatch( &mut ctx_clone, req ).await;
        ( index, outcome )
      } );
    }

    use futures_util::StreamExt;
    while let Some( ( index, outcome ) ) = futures.next().await
    {
      outcomes.push( ( index, outcome ) );
    }
    outcomes.sort_by_key( |( index, _ )| *index );

    for ( index, outcome ) in outcomes
    {
      match outcome
      {
        Ok( resp ) =>
        {
          if is_response_success( &resp ) { result.success_count += 1; } else { result.failure_count += 1; }
          result.responses[ index ] = Some( resp );
        }
        Err( err ) =>
        {
          result.failure_count += 1;
          let wrapped = HttpClientError::batch_at( index, err );
          if result.final_error.is_none()
          {
            result.final_error = Some( wrapped.clone() );
          }
          result.chunk_errors.push( wrapped );
        }
      }
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use crate::request::Method;
    use std::collections::HashMap;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    fn ok_response( status : u16 ) -> Response
    {
      Response::from_parts( status, Vec::new(), HashMap::new(), Duration::ZERO, "c".to_string() )
    }

    #[ tokio::test ]
    async fn sequential_reports_failing_index()
    {
      let config = BatchConfig { strategy : BatchStrategy::Sequential, ..BatchConfig::default_config() };
      let requests : Vec< Request > = ( 0..3 ).map( |i| Request::new( Method::Get, format!( "/{i}" ) ) ).collect();
      let mut ctx = RequestContext::default();

      let dispatch : Arc< Dispatch< '_ > > = Arc::new( |_ctx, req : &Request| {
        let fail = req.url == "/1";
        Box::pin( async move
        {
          if fail { Err( HttpClientError::Transport( "boom".to_string() ) ) } else { Ok( ok_response( 200 ) ) }
        } )
      } );

      let result = execute_batch( &config, &mut ctx, &requests, dispatch ).await;
      assert_eq!( result.success_count, 2 );
      assert_eq!( result.failure_count, 1 );
      assert!( !result.is_success() );
    }

    #[ tokio::test ]
    async fn fail_fast_stops_on_first_bad_status()
    {
      let config = BatchConfig { strategy : BatchStrategy::FailFast, ..BatchConfig::default_config() };
      let requests : Vec< Request > = ( 0..3 ).map( |i| Request::new( Method::Get, format!( "/{i}" ) ) ).collect();
      let calls = Arc::new( AtomicUsize::new( 0 ) );
      let calls_clone = calls.clone();
      let mut ctx = RequestContext::default();

      let dispatch : Arc< Dispatch< '_ > > = Arc::new( move |_ctx, req : &Request| {
        calls_clone.fetch_add( 1, Ordering::SeqCst );
        let status = if req.url == "/1" { 500 } else { 200 };
        Box::pin( async move { Ok( ok_response( status ) ) } )
      } );

      let result = execute_batch( &config, &mut ctx, &requests, dispatch ).await;
      assert_eq!( calls.load( Ordering::SeqCst ), 2 );
      assert!( matches!( result.final_error, Some( HttpClientError::BatchFailFast { index : 1, status : 500 } ) ) );
    }

    #[ tokio::test ]
    async fn parallel_preserves_index_correspondence()
    {
      let config = BatchConfig { strategy : BatchStrategy::Parallel, max_concurrency : 4, ..BatchConfig::default_config() };
      let requests : Vec< Request > = ( 0..10 ).map( |i| Request::new( Method::Get, format!( "/{i}" ) ) ).collect();
      let mut ctx = RequestContext::default();

      let dispatch : Arc< Dispatch< '_ > > = Arc::new( |_ctx, req : &Request| {
        let url = req.url.clone();
        Box::pin( async move
        {
          let index : u16 = url.trim_start_matches( '/' ).parse().unwrap();
          Ok( ok_response( 200 + index ) )
        } )
      } );

      let result = execute_batch( &config, &mut ctx, &requests, dispatch ).await;
      for ( i, resp ) in result.responses.iter().enumerate()
      {
        assert_eq!( resp.as_ref().unwrap().status_code, 200 + i as u16 );
      }
    }

    #[ test ]
    fn success_and_failure_rates_are_zero_for_empty_batch()
    {
      let result = BatchResult::default();
      assert_eq!( result.success_rate(), 0.0 );
      assert_eq!( result.failure_rate(), 0.0 );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    BatchStrategy,
    BatchConfig,
    BatchResult,
    Dispatch,
    execute_batch,
  };
}
