use blog_client::{BlogClientHttp, NewPost, PostChanges, PostListing, ShareRequest};
use clap::Parser;
use uuid::Uuid;

#[derive(Parser, Debug)]
struct Cli {
    #[clap(short, long)]
    server: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Parser, Debug)]
enum Command {
    Register {
        #[clap(long)]
        username: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        password: String,
    },
    Login {
        #[clap(long)]
        username: String,
        #[clap(long)]
        password: String,
    },
    ListPosts {
        #[clap(long)]
        tag: Option<String>,
        #[clap(long)]
        page: Option<String>,
    },
    Latest {
        #[clap(long)]
        count: Option<i64>,
    },
    GetPost {
        year: i32,
        month: u32,
        day: u32,
        slug: String,
    },
    Search {
        query: String,
    },
    Comment {
        post_id: Uuid,
        #[clap(long)]
        name: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        body: String,
    },
    Share {
        post_id: Uuid,
        #[clap(long)]
        name: String,
        #[clap(long)]
        email: String,
        #[clap(long)]
        to: String,
        #[clap(long, default_value = "")]
        comments: String,
    },
    Feed,
    CreatePost {
        #[clap(long)]
        title: String,
        #[clap(long)]
        body: String,
        #[clap(long)]
        slug: Option<String>,
        #[clap(long, default_value = "draft")]
        status: String,
        #[clap(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    UpdatePost {
        id: Uuid,
        #[clap(long)]
        title: Option<String>,
        #[clap(long)]
        body: Option<String>,
        #[clap(long)]
        status: Option<String>,
        #[clap(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
    },
    DeletePost {
        id: Uuid,
    },
    Moderate {
        comment_id: Uuid,
        #[clap(long, action = clap::ArgAction::Set)]
        active: bool,
    },
}

fn print_listing(listing: &PostListing) {
    if let Some(tag) = &listing.tag {
        println!("Posts tagged with \"{}\"", tag.name);
    }
    for post in &listing.page.items {
        println!("- {}", post);
    }
    println!(
        "Page {} of {} ({} published in total)",
        listing.page.number, listing.page.num_pages, listing.total_published
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let endpoint = args.server.as_deref().unwrap_or("http://127.0.0.1:8080");
    let mut client = BlogClientHttp::connect(endpoint)?;

    match args.command {
        Command::Register {
            username,
            email,
            password,
        } => {
            client.register(&username, &email, &password).await?;
            println!("Successfully registered!");
        }
        Command::Login { username, password } => {
            client.login(&username, &password).await?;
            println!("Successfully logged in!");
        }
        Command::ListPosts { tag, page } => {
            let listing = client.list_posts(tag.as_deref(), page.as_deref()).await?;
            print_listing(&listing);
        }
        Command::Latest { count } => {
            for post in client.latest_posts(count).await? {
                println!("- {}", post);
            }
        }
        Command::GetPost {
            year,
            month,
            day,
            slug,
        } => {
            let detail = client.get_post(year, month, day, &slug).await?;
            println!("{}\n\n{}", detail.post, detail.post.body);
            println!("\n{} comments", detail.comments.len());
            for comment in &detail.comments {
                println!("  {}", comment);
            }
            if !detail.similar_posts.is_empty() {
                println!("\nSimilar posts");
                for post in &detail.similar_posts {
                    println!("- {}", post);
                }
            }
        }
        Command::Search { query } => {
            let response = client.search(&query).await?;
            println!("Found {} results", response.results.len());
            for hit in response.results {
                println!("- {:.2} {}", hit.rank, hit.post);
            }
        }
        Command::Comment {
            post_id,
            name,
            email,
            body,
        } => {
            let comment = client.comment(post_id, &name, &email, &body).await?;
            println!("Your comment has been added: {}", comment.id);
        }
        Command::Share {
            post_id,
            name,
            email,
            to,
            comments,
        } => {
            let form = ShareRequest {
                name,
                email,
                to,
                comments,
            };
            let response = client.share(post_id, &form).await?;
            if response.sent {
                println!("\"{}\" was successfully sent to {}", response.post.title, form.to);
            }
        }
        Command::Feed => {
            println!("{}", client.feed().await?);
        }
        Command::CreatePost {
            title,
            body,
            slug,
            status,
            tags,
        } => {
            let post = client
                .create_post(&NewPost {
                    title,
                    slug,
                    body,
                    status,
                    publish: None,
                    tags,
                })
                .await?;
            println!("Post created: {}", post);
        }
        Command::UpdatePost {
            id,
            title,
            body,
            status,
            tags,
        } => {
            let changes = PostChanges {
                title,
                body,
                status,
                tags,
                ..PostChanges::default()
            };
            let post = client.update_post(id, &changes).await?;
            println!("Post updated: {}", post)
        }
        Command::DeletePost { id } => {
            client.delete_post(id).await?;
            println!("Post deleted!")
        }
        Command::Moderate { comment_id, active } => {
            let comment = client.moderate_comment(comment_id, active).await?;
            println!("Comment {} active: {}", comment.id, comment.active);
        }
    }

    Ok(())
}
