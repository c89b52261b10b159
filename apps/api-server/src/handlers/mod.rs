//! HTTP handlers and route configuration.

mod auth;
mod health;
mod posts;
mod users;

use actix_web::web;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("", web::get().to(health::api_root))
            .route("/", web::get().to(health::api_root))
            .route("/health", web::get().to(health::health_check))
            // Auth routes
            .route("/register", web::post().to(auth::register))
            .route("/token", web::post().to(auth::token))
            // Users; `me` is registered before `{username}`
            .service(
                web::scope("/users")
                    .route("", web::get().to(users::list_users))
                    .service(
                        web::resource("/me")
                            .route(web::get().to(users::me))
                            .route(web::put().to(users::update_me))
                            .route(web::patch().to(users::update_me))
                            .route(web::delete().to(users::delete_me)),
                    )
                    .route("/{username}", web::get().to(users::get_user))
                    .route("/{username}/posts", web::get().to(users::user_posts)),
            )
            // Posts
            .service(
                web::scope("/posts")
                    .service(
                        web::resource("")
                            .route(web::get().to(posts::list_posts))
                            .route(web::post().to(posts::create_post)),
                    )
                    .service(
                        web::resource("/{slug}")
                            .route(web::get().to(posts::get_post))
                            .route(web::put().to(posts::update_post))
                            .route(web::patch().to(posts::update_post))
                            .route(web::delete().to(posts::delete_post)),
                    )
                    .route("/{slug}/like", web::post().to(posts::like_post))
                    .service(
                        web::resource("/{slug}/comments")
                            .route(web::get().to(posts::list_comments))
                            .route(web::post().to(posts::add_comment)),
                    ),
            ),
    );
}
