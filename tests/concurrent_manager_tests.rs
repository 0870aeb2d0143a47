//! §8 scenario 4 : `ClientManager::get_or_create` guarantees at-most-once
//! construction under real concurrent access (I1).

use std::sync::Arc;
use std::sync::atomic::{ AtomicUsize, Ordering };

use http_client_core::{ ClientManager, Config, ReqwestProvider };

#[ tokio::test ]
async fn hundred_concurrent_callers_share_one_construction()
{
  let construction_count = Arc::new( AtomicUsize::new( 0 ) );
  let manager = Arc::new( ClientManager::new( {
    let construction_count = construction_count.clone();
    move |config : &Config| {
      construction_count.fetch_add( 1, Ordering::SeqCst );
      ReqwestProvider::new( config )
    }
  } ) );

  let mut handles = Vec::new();
  for _ in 0..100
  {
    let manager = manager.clone();
    handles.push( tokio::spawn( async move {
      manager.get_or_create( "api", Config::default_config().with_base_url( "http://localhost".to_string() ) ).await.unwrap()
    } ) );
  }

  let mut clients = Vec::with_capacity( 100 );
  for handle in handles
  {
    clients.push( handle.await.unwrap() );
  }

  assert_eq!( construction_count.load( Ordering::SeqCst ), 1 );
  let first = &clients[ 0 ];
  for client in &clients[ 1.. ]
  {
    assert!( Arc::ptr_eq( first, client ) );
  }
}
