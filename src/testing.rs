//! Local HTTP server for exercising the clients against canned replies.

use warp::filters::BoxedFilter;
use warp::reply::Response;

/// Serves `routes` on an ephemeral localhost port and returns its base URL.
pub(crate) async fn serve(routes: BoxedFilter<(Response,)>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(warp::serve(routes).incoming(listener).run());
    format!("http://{addr}")
}
