mod auth;
mod blogs;
mod comments;
mod health_check;
mod likes;
mod users;

pub use auth::{login, logout, refresh_token, register, REFRESH_COOKIE};
pub use blogs::{create_blog, delete_blog, get_all_blogs, get_blog_by_slug, update_blog};
pub use comments::{comment_blog, delete_comment, get_comments_by_blog};
pub use health_check::{health_check, index};
pub use likes::{like_blog, unlike_blog};
pub use users::{
    delete_current_user, delete_user, get_all_users, get_current_user, get_user,
    update_current_user,
};

use actix_web::web;

use crate::auth::{TokenIssuer, ADMIN_ONLY, ANY_ROLE};
use crate::middleware::JwtMiddleware;

/// Mount the versioned API.
///
/// Role allow-lists sit on the resource middleware; blog writes are gated
/// inside their handlers since they share a resource with reads.
pub fn configure(cfg: &mut web::ServiceConfig, issuer: &TokenIssuer) {
    let any_role = || JwtMiddleware::new(issuer.clone()).allow(ANY_ROLE);
    let admin_only = || JwtMiddleware::new(issuer.clone()).allow(ADMIN_ONLY);

    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/refresh-token", web::post().to(refresh_token))
            .service(
                web::resource("/logout")
                    .wrap(any_role())
                    .route(web::post().to(logout)),
            ),
    )
    .service(
        web::scope("/users")
            .service(
                web::resource("/current")
                    .wrap(any_role())
                    .route(web::get().to(get_current_user))
                    .route(web::put().to(update_current_user))
                    .route(web::delete().to(delete_current_user)),
            )
            .service(
                web::resource("")
                    .wrap(admin_only())
                    .route(web::get().to(get_all_users)),
            )
            .service(
                web::resource("/{user_id}")
                    .wrap(admin_only())
                    .route(web::get().to(get_user))
                    .route(web::delete().to(delete_user)),
            ),
    )
    .service(
        web::scope("/blogs")
            .wrap(any_role())
            .service(
                web::resource("")
                    .route(web::get().to(get_all_blogs))
                    .route(web::post().to(create_blog)),
            )
            .service(
                web::resource("/{blog_ref}")
                    .route(web::get().to(get_blog_by_slug))
                    .route(web::put().to(update_blog))
                    .route(web::delete().to(delete_blog)),
            ),
    )
    .service(
        web::scope("/comments")
            .wrap(any_role())
            .service(
                web::resource("/blog/{blog_id}")
                    .route(web::get().to(get_comments_by_blog))
                    .route(web::post().to(comment_blog)),
            )
            .service(web::resource("/{comment_id}").route(web::delete().to(delete_comment))),
    )
    .service(
        web::scope("/likes").wrap(any_role()).service(
            web::resource("/blog/{blog_id}")
                .route(web::post().to(like_blog))
                .route(web::delete().to(unlike_blog)),
        ),
    );
}
