//! Retry engine : backoff computation and cancellation-aware waiting (§4.6).

#[ allow( clippy::missing_inline_in_public_items ) ]
mod private
{
  use std::time::Duration;

  use crate::config::RetryConfig;
  use crate::error::{ HttpClientError, HttpClientResult };
  use crate::provider::ProviderFuture;
  use crate::request::RequestContext;
  use crate::response::Response;

  /// `delay(1) = initial_interval`; `delay(k) = min(delay(k-1) * multiplier, max_interval)`.
  /// Computed in floating-point seconds rather than repeated `Duration`
  /// multiplication so the growth cap is hit exactly instead of risking a
  /// `Duration` overflow panic on large `k`.
  #[ must_use ]
  pub fn delay_for_attempt( config : &RetryConfig, attempt : u32 ) -> Duration
  {
    if attempt == 0
    {
      return Duration::ZERO;
    }
    let initial = config.initial_interval.as_secs_f64();
    let max = config.max_interval.as_secs_f64();
    let grown = initial * config.multiplier.powi( ( attempt - 1 ) as i32 );
    Duration::from_secs_f64( grown.min( max ).max( 0.0 ) )
  }

  /// Wrap a single provider call with the retry loop described in §4.6 : for
  /// `attempt` in `0..=max_retries`, dispatch (waiting `delay_for_attempt`
  /// first when `attempt > 0`), then stop if `retry_condition` says not to
  /// continue or attempts are exhausted.
  ///
  /// # Errors
  ///
  /// Returns [`HttpClientError::Cancelled`] if `ctx` is canceled while
  /// waiting between attempts, or the last attempt's error otherwise.
  /// `dispatch` is bound with an explicit higher-ranked lifetime rather than
  /// a plain associated `Fut` type, since the future it returns borrows
  /// `ctx` for exactly as long as that particular call : a single fixed
  /// `Fut` type could not express a borrow whose lifetime changes on every
  /// loop iteration.
  pub async fn with_retry< D >
  (
    config : &RetryConfig,
    ctx : &mut RequestContext,
    mut dispatch : D,
  ) -> HttpClientResult< Response >
  where
    D : for< 'a > FnMut( &'a mut RequestContext ) -> ProviderFuture< 'a, HttpClientResult< Response > >,
  {
    let mut last : HttpClientResult< Response > = Err( HttpClientError::Internal( "retry loop never dispatched".to_string() ) );

    for attempt in 0..=config.max_retries
    {
      if attempt > 0
      {
        let delay = delay_for_attempt( config, attempt );
        tokio::select!
        {
          () = tokio::time::sleep( delay ) => {},
          () = ctx.cancelled() => return Err( HttpClientError::Cancelled ),
        }
      }

      last = dispatch( ctx ).await;

      let ( response_ref, error_ref ) = match &last
      {
        Ok( resp ) => ( Some( resp ), None ),
        Err( err ) => ( None, Some( err ) ),
      };

      if !( config.retry_condition )( response_ref, error_ref )
      {
        break;
      }
    }

    last
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{ AtomicU32, Ordering };
    use std::sync::Arc;

    #[ test ]
    fn delay_grows_exponentially_then_clamps()
    {
      let config = RetryConfig::default_retry_config()
        .with_initial_interval( Duration::from_millis( 100 ) )
        .with_max_interval( Duration::from_millis( 350 ) )
        .with_multiplier( 2.0 );

      assert_eq!( delay_for_attempt( &config, 1 ), Duration::from_millis( 100 ) );
      assert_eq!( delay_for_attempt( &config, 2 ), Duration::from_millis( 200 ) );
      assert_eq!( delay_for_attempt( &config, 3 ), Duration::from_millis( 350 ) );
      assert_eq!( delay_for_attempt( &config, 10 ), Duration::from_millis( 350 ) );
    }

    #[ tokio::test ]
    async fn stops_retrying_once_condition_is_false()
    {
      let config = RetryConfig::default_retry_config()
        .with_max_retries( 5 )
        .with_initial_interval( Duration::from_millis( 1 ) )
        .with_retry_condition( std::sync::Arc::new( |resp, _err| resp.is_none_or( |r| r.status_code >= 500 ) ) );

      let attempts = Arc::new( AtomicU32::new( 0 ) );
      let attempts_clone = attempts.clone();
      let mut ctx = RequestContext::default();

      let result = with_retry( &config, &mut ctx, move |_ctx| {
        let attempts = attempts_clone.clone();
        Box::pin( async move
        {
          let n = attempts.fetch_add( 1, Ordering::SeqCst );
          let status = if n < 2 { 503 } else { 200 };
          Ok( Response::from_parts( status, Vec::new(), HashMap::new(), Duration::ZERO, "c".to_string() ) )
        } )
      } ).await;

      assert!( result.is_ok() );
      assert_eq!( attempts.load( Ordering::SeqCst ), 3 );
    }

    #[ tokio::test ]
    async fn exhausts_max_retries_and_returns_last_outcome()
    {
      let config = RetryConfig::default_retry_config()
        .with_max_retries( 2 )
        .with_initial_interval( Duration::from_millis( 1 ) );

      let attempts = Arc::new( AtomicU32::new( 0 ) );
      let attempts_clone = attempts.clone();
      let mut ctx = RequestContext::default();

      let result = with_retry( &config, &mut ctx, move |_ctx| {
        let attempts = attempts_clone.clone();
        Box::pin( async move
        {
          attempts.fetch_add( 1, Ordering::SeqCst );
          Err( HttpClientError::Transport( "boom".to_string() ) )
        } )
      } ).await;

      assert!( result.is_err() );
      assert_eq!( attempts.load( Ordering::SeqCst ), 3 );
    }
  }
}

crate::mod_interface!
{
  exposed use
  {
    delay_for_attempt,
    with_retry,
  };
}
