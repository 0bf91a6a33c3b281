pub mod api;
pub mod films;
pub mod people;
pub mod search;
pub mod stats;

use rocket::routes;

pub fn get_routes() -> Vec<rocket::Route> {
    routes![
        api::health_check,
        api::get_cache_stats,
        api::clear_cache,
        api::recent_searches,
        // Catalog routes
        people::search_people,
        people::get_person,
        films::search_films,
        films::get_film,
        // Stats routes
        stats::get_stats,
        stats::refresh_stats,
    ]
}
