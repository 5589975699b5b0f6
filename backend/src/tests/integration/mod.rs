// API tests over the full router, one request per `oneshot`

mod api_auth;
mod api_registry;
mod api_tickets;
