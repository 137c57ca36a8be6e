use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::data::user_repository::UserRepository;
use crate::infrastructure::security::JwtKeys;
use crate::presentation::handlers::{auth, comment, feed, post, share};
use crate::presentation::middleware::BearerAuth;
use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

/// Public reading routes, comment/share submissions, syndication and the
/// JWT protected authoring scope.
pub fn configure<P, C, U>(cfg: &mut web::ServiceConfig, keys: JwtKeys)
where
    P: PostRepository + 'static,
    C: CommentRepository + 'static,
    U: UserRepository + 'static,
{
    cfg.route("/feed", web::get().to(feed::latest_feed::<P>))
        .route("/sitemap.xml", web::get().to(feed::sitemap::<P>))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(health))
                .service(auth::scope::<U>())
                .service(web::resource("/posts").route(web::get().to(post::list_posts::<P>)))
                .service(
                    web::resource("/posts/latest").route(web::get().to(post::latest_posts::<P>)),
                )
                .service(
                    web::resource("/posts/search").route(web::get().to(post::search_posts::<P>)),
                )
                .service(
                    web::resource("/posts/tag/{tag_slug}")
                        .route(web::get().to(post::list_posts_by_tag::<P>)),
                )
                .service(
                    web::resource("/posts/{year}/{month}/{day}/{slug}")
                        .route(web::get().to(post::post_detail::<P, C>)),
                )
                .service(
                    web::resource("/posts/{id}/comment")
                        .route(web::post().to(comment::post_comment::<P, C>)),
                )
                .service(
                    web::resource("/posts/{id}/share")
                        .route(web::get().to(share::share_form::<P>))
                        .route(web::post().to(share::share_post::<P>)),
                )
                .service(
                    web::scope("/author")
                        .wrap(BearerAuth::<U>::new(keys))
                        .service(
                            web::resource("/posts").route(web::post().to(post::create_post::<P>)),
                        )
                        .service(
                            web::resource("/posts/{id}")
                                .route(web::put().to(post::update_post::<P>))
                                .route(web::delete().to(post::delete_post::<P>)),
                        )
                        .service(
                            web::resource("/comments/{id}/active")
                                .route(web::put().to(comment::moderate_comment::<C>)),
                        ),
                ),
        );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::auth_service::AuthService;
    use crate::application::comment_service::CommentService;
    use crate::application::post_service::PostService;
    use crate::application::share_service::ShareService;
    use crate::data::comment_repository::MockCommentRepository;
    use crate::data::post_repository::MockPostRepository;
    use crate::data::user_repository::MockUserRepository;
    use crate::domain::comment::Comment;
    use crate::domain::forms::CommentForm;
    use crate::domain::post::{Post, PostStatus};
    use crate::domain::tag::Tag;
    use crate::domain::user::User;
    use crate::infrastructure::config::{MailConfig, SiteConfig};
    use crate::infrastructure::mailer::MockMailer;
    use chrono::{TimeZone, Utc};
    use actix_web::dev::Service;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use uuid::Uuid;

    fn keys() -> JwtKeys {
        JwtKeys::new("test-secret".into())
    }

    fn published_post() -> Post {
        Post::new(
            Uuid::new_v4(),
            "Hello".into(),
            None,
            "body".into(),
            PostStatus::Published,
            None,
            vec![],
        )
    }

    fn services(
        posts: MockPostRepository,
        comments: MockCommentRepository,
    ) -> (
        web::Data<PostService<MockPostRepository>>,
        web::Data<CommentService<MockCommentRepository>>,
    ) {
        (
            web::Data::from(Arc::new(PostService::new(Arc::new(posts)))),
            web::Data::from(Arc::new(CommentService::new(Arc::new(comments)))),
        )
    }

    fn share_data(mailer: MockMailer) -> web::Data<ShareService> {
        web::Data::new(ShareService::new(
            Arc::new(mailer),
            SiteConfig::default(),
            MailConfig::default(),
        ))
    }

    fn comment(post_id: Uuid, name: &str, active: bool) -> Comment {
        let mut comment = Comment::new(
            post_id,
            CommentForm {
                name: name.into(),
                email: "reader@example.com".into(),
                body: "great read".into(),
            },
        );
        comment.active = active;
        comment
    }

    fn configure_mocks(cfg: &mut web::ServiceConfig) {
        configure::<MockPostRepository, MockCommentRepository, MockUserRepository>(cfg, keys())
    }

    #[actix_web::test]
    async fn comment_endpoint_rejects_get() {
        let app = test::init_service(App::new().configure(configure_mocks)).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/posts/{}/comment", Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[actix_web::test]
    async fn invalid_comment_returns_field_errors_and_persists_nothing() {
        let post = published_post();
        let post_id = post.id;
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_published_by_id()
            .returning(move |_| Ok(Some(post.clone())));
        let mut comments = MockCommentRepository::new();
        comments.expect_create().never();
        let (posts, comments) = services(posts, comments);

        let app = test::init_service(
            App::new()
                .app_data(posts)
                .app_data(comments)
                .configure(configure_mocks),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/posts/{post_id}/comment"))
            .set_json(json!({
                "name": "n".repeat(90),
                "email": "reader@example.com",
                "body": "hi"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["details"]["name"].is_array());
        assert!(body["details"].get("email").is_none());
    }

    #[actix_web::test]
    async fn valid_comment_is_created() {
        let post = published_post();
        let post_id = post.id;
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_published_by_id()
            .returning(move |_| Ok(Some(post.clone())));
        let mut comments = MockCommentRepository::new();
        comments.expect_create().times(1).returning(|c| Ok(c));
        let (posts, comments) = services(posts, comments);

        let app = test::init_service(
            App::new()
                .app_data(posts)
                .app_data(comments)
                .configure(configure_mocks),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/posts/{post_id}/comment"))
            .set_json(json!({
                "name": "Ann",
                "email": "ann@example.com",
                "body": "Nice one"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["active"], Value::Bool(true));
        assert_eq!(body["post_id"], Value::String(post_id.to_string()));
    }

    #[actix_web::test]
    async fn unknown_tag_is_404() {
        let mut posts = MockPostRepository::new();
        posts.expect_find_tag_by_slug().returning(|_| Ok(None));
        let (posts, comments) = services(posts, MockCommentRepository::new());

        let app = test::init_service(
            App::new()
                .app_data(posts)
                .app_data(comments)
                .configure(configure_mocks),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/posts/tag/missing?page=2")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn malformed_page_is_served_as_first_page() {
        let mut posts = MockPostRepository::new();
        posts.expect_count_published().returning(|_| Ok(7));
        posts
            .expect_list_published()
            .withf(|tag, limit, offset| tag.is_none() && *limit == 3 && *offset == 0)
            .returning(|_, _, _| Ok(vec![]));
        let (posts, comments) = services(posts, MockCommentRepository::new());

        let app = test::init_service(
            App::new()
                .app_data(posts)
                .app_data(comments)
                .configure(configure_mocks),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/posts?page=abc")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["page"]["number"], json!(1));
        assert_eq!(body["page"]["num_pages"], json!(3));
        assert_eq!(body["total_published"], json!(7));
    }

    #[actix_web::test]
    async fn authoring_requires_a_token() {
        let app = test::init_service(App::new().configure(configure_mocks)).await;

        let req = test::TestRequest::post()
            .uri("/api/author/posts")
            .set_json(json!({ "title": "t", "body": "b" }))
            .to_request();
        let resp = app.call(req).await;
        let status = match resp {
            Ok(resp) => resp.status(),
            Err(err) => err.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn share_form_starts_empty_and_unsent() {
        let post = published_post();
        let post_id = post.id;
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_published_by_id()
            .returning(move |_| Ok(Some(post.clone())));
        let mut mailer = MockMailer::new();
        mailer.expect_send().never();
        let (posts, comments) = services(posts, MockCommentRepository::new());

        let app = test::init_service(
            App::new()
                .app_data(posts)
                .app_data(comments)
                .app_data(share_data(mailer))
                .configure(configure_mocks),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/posts/{post_id}/share"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["sent"], json!(false));
        assert_eq!(body["form"]["to"], json!(""));
        assert_eq!(body["form"]["name"], json!(""));
        assert_eq!(body["post"]["id"], json!(post_id.to_string()));
    }

    #[actix_web::test]
    async fn share_with_bad_recipient_sends_nothing() {
        let post = published_post();
        let post_id = post.id;
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_published_by_id()
            .returning(move |_| Ok(Some(post.clone())));
        let mut mailer = MockMailer::new();
        mailer.expect_send().never();
        let (posts, comments) = services(posts, MockCommentRepository::new());

        let app = test::init_service(
            App::new()
                .app_data(posts)
                .app_data(comments)
                .app_data(share_data(mailer))
                .configure(configure_mocks),
        )
        .await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/posts/{post_id}/share"))
            .set_json(json!({
                "name": "Ann",
                "email": "ann@example.com",
                "to": "not-an-address",
                "comments": ""
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["details"]["to"].is_array());
        assert!(body["details"].get("name").is_none());
    }

    #[actix_web::test]
    async fn detail_of_unpublished_or_unknown_post_is_404() {
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_published_by_date()
            .times(1)
            .returning(|_, _| Ok(None));
        let (posts, comments) = services(posts, MockCommentRepository::new());

        let app = test::init_service(
            App::new()
                .app_data(posts)
                .app_data(comments)
                .configure(configure_mocks),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/posts/2024/6/9/draft-post")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        // an impossible date never reaches the repository
        let req = test::TestRequest::get()
            .uri("/api/posts/2024/2/30/anything")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn detail_shows_active_comments_and_similar_posts() {
        let rust = Tag::new("rust");
        let publish = Utc.with_ymd_and_hms(2024, 6, 9, 8, 0, 0).unwrap();
        let post = Post::new(
            Uuid::new_v4(),
            "Traits".into(),
            None,
            "body".into(),
            PostStatus::Published,
            Some(publish),
            vec![rust.clone()],
        );
        let related = Post::new(
            Uuid::new_v4(),
            "Generics".into(),
            None,
            "body".into(),
            PostStatus::Published,
            None,
            vec![rust.clone()],
        );
        let post_id = post.id;
        let related_id = related.id;

        let mut posts = MockPostRepository::new();
        posts
            .expect_find_published_by_date()
            .withf(|date, slug| date.to_string() == "2024-06-09" && slug == "traits")
            .returning(move |_, _| Ok(Some(post.clone())));
        posts
            .expect_published_sharing_tags()
            .withf(move |tags, exclude| tags == &vec![rust.id] && *exclude == post_id)
            .returning(move |_, _| Ok(vec![related.clone()]));
        let mut comments = MockCommentRepository::new();
        comments
            .expect_list_active()
            .withf(move |id| *id == post_id)
            .returning(move |id| Ok(vec![comment(id, "Ann", true)]));
        let (posts, comments) = services(posts, comments);

        let app = test::init_service(
            App::new()
                .app_data(posts)
                .app_data(comments)
                .configure(configure_mocks),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/posts/2024/6/9/traits")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["post"]["id"], json!(post_id.to_string()));
        assert_eq!(body["post"]["url"], json!("/api/posts/2024/6/9/traits"));
        assert_eq!(body["comments"].as_array().unwrap().len(), 1);
        assert_eq!(body["comments"][0]["name"], json!("Ann"));
        assert_eq!(body["similar_posts"].as_array().unwrap().len(), 1);
        assert_eq!(body["similar_posts"][0]["id"], json!(related_id.to_string()));
    }

    #[actix_web::test]
    async fn search_returns_ranked_matches() {
        let hit = Post::new(
            Uuid::new_v4(),
            "Rust tips".into(),
            None,
            "borrowing".into(),
            PostStatus::Published,
            None,
            vec![],
        );
        let miss = Post::new(
            Uuid::new_v4(),
            "Cooking".into(),
            None,
            "pasta".into(),
            PostStatus::Published,
            None,
            vec![],
        );
        let hit_id = hit.id;
        let mut posts = MockPostRepository::new();
        posts
            .expect_search_published()
            .withf(|q| q == "rust")
            .times(1)
            .returning(move |_| Ok(vec![hit.clone(), miss.clone()]));
        let (posts, comments) = services(posts, MockCommentRepository::new());

        let app = test::init_service(
            App::new()
                .app_data(posts)
                .app_data(comments)
                .configure(configure_mocks),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/posts/search?query=rust")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["query"], json!("rust"));
        assert_eq!(body["results"].as_array().unwrap().len(), 1);
        assert_eq!(body["results"][0]["post"]["id"], json!(hit_id.to_string()));
        assert_eq!(body["results"][0]["rank"], json!(1.0));

        // no query means no search at all
        let req = test::TestRequest::get().uri("/api/posts/search").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["query"], Value::Null);
        assert_eq!(body["results"], json!([]));
    }

    #[actix_web::test]
    async fn only_the_author_may_edit_or_delete() {
        let intruder = User::new("mallory".into(), "m@example.com".into(), "hash".into());
        let intruder_id = intruder.id;
        let post = published_post();
        let post_id = post.id;

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(intruder.clone())));
        let mut posts = MockPostRepository::new();
        posts
            .expect_find_by_id()
            .returning(move |_| Ok(Some(post.clone())));
        posts.expect_update_post().never();
        posts.expect_delete_post().never();
        let (posts, comments) = services(posts, MockCommentRepository::new());
        let auth = web::Data::from(Arc::new(AuthService::new(Arc::new(users), keys())));

        let app = test::init_service(
            App::new()
                .app_data(posts)
                .app_data(comments)
                .app_data(auth)
                .configure(configure_mocks),
        )
        .await;
        let bearer = format!("Bearer {}", keys().generate_token(intruder_id).unwrap());

        let req = test::TestRequest::put()
            .uri(&format!("/api/author/posts/{post_id}"))
            .insert_header(("Authorization", bearer.clone()))
            .set_json(json!({ "title": "hijacked" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/author/posts/{post_id}"))
            .insert_header(("Authorization", bearer))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
