use crate::client::BoardClientWeb;
use crate::config::realtime_enabled;
use crate::error::BoardWasmError;
use board_core::data::storage::content_type_for;
use board_core::{BoardService, ImageFile, Post, PostBoard, PostDraft, PostId};
use dioxus::prelude::*;
use tracing::error;

mod client;
mod config;
mod error;
mod realtime;

const MAIN_CSS: Asset = asset!("/assets/main.css");

fn main() {
    dioxus::launch(App);
}

fn service() -> BoardService<BoardClientWeb> {
    BoardService::new(BoardClientWeb::from_build_env())
}

#[component]
fn App() -> Element {
    rsx! {
        document::Link { rel: "stylesheet", href: MAIN_CSS }
        Posts {}
    }
}

#[component]
fn Posts() -> Element {
    let mut board = use_signal(PostBoard::new);
    let mut pending_delete = use_signal(|| None::<PostId>);

    use_future(move || async move {
        // Failures are logged by the service; the page then shows an empty board.
        let posts = service().load_posts().await.unwrap_or_default();
        board.write().replace_all(posts);
    });

    use_future(move || async move {
        if !realtime_enabled() {
            return;
        }
        if let Err(e) = realtime::follow_changes(board).await {
            error!(error = %e, "realtime feed stopped");
        }
    });

    let on_confirm_delete = move |_| {
        let Some(id) = *pending_delete.read() else {
            return;
        };
        pending_delete.set(None);
        spawn(async move {
            if service().delete_post(id).await.is_ok() {
                board.write().remove(id);
            }
        });
    };

    let loaded = board.read().is_loaded();
    let posts = board.read().posts().to_vec();
    let confirming = pending_delete.read().is_some();

    if !loaded {
        return rsx! { p { class: "loading", "Loading..." } };
    }

    rsx! {
        div { class: "board",
            NewPostDialog { on_created: move |post: Post| board.write().push(post) }

            div { class: "grid",
                for post in posts {
                    PostCard {
                        key: "{post.id}",
                        post: post.clone(),
                        on_delete: move |id: PostId| pending_delete.set(Some(id)),
                    }
                }
            }

            if confirming {
                div { class: "overlay",
                    div { class: "dialog",
                        h2 { "Delete post?" }
                        p { class: "muted", "This removes the post for everyone." }
                        div { class: "actions",
                            button { onclick: move |_| pending_delete.set(None), "Cancel" }
                            button { class: "destructive", onclick: on_confirm_delete, "Delete" }
                        }
                    }
                }
            }
        }
    }
}

#[component]
fn PostCard(post: Post, on_delete: EventHandler<PostId>) -> Element {
    let id = post.id;
    let image = post.image_url.clone().unwrap_or_default();
    let description = post.description.clone().unwrap_or_default();

    rsx! {
        article { class: "card",
            header { h3 { class: "truncate", "{post.title}" } }
            div { class: "card-content",
                if !image.is_empty() {
                    img { src: "{image}", alt: "{post.title}" }
                }
                p { class: "truncate", "{description}" }
            }
            footer {
                button { class: "destructive", onclick: move |_| on_delete.call(id), "Delete" }
            }
        }
    }
}

#[component]
fn NewPostDialog(on_created: EventHandler<Post>) -> Element {
    let mut open = use_signal(|| false);
    let mut title = use_signal(String::new);
    let mut description = use_signal(String::new);
    let mut image = use_signal(|| None::<ImageFile>);

    let on_file = move |evt: FormEvent| async move {
        let Some(file) = evt.files().into_iter().next() else {
            image.set(None);
            return;
        };
        let file_name = file.name();
        match file.read_bytes().await {
            Ok(bytes) => image.set(Some(ImageFile {
                content_type: content_type_for(&file_name).to_string(),
                file_name,
                bytes: bytes.to_vec(),
            })),
            Err(e) => {
                error!(error = %e, "error reading image");
                image.set(None);
            }
        }
    };

    let on_create = move |_| {
        let draft = PostDraft {
            title: title.read().clone(),
            description: Some(description.read().clone()).filter(|d| !d.is_empty()),
            image: image.read().clone(),
        };
        if draft.validate::<BoardWasmError>().is_err() {
            let _ = document::eval(r#"alert("Title is required!")"#);
            return;
        }
        open.set(false);

        spawn(async move {
            if let Ok(post) = service().create_post(draft).await {
                on_created.call(post);
                title.set(String::new());
                description.set(String::new());
                image.set(None);
            }
        });
    };

    rsx! {
        button { class: "primary", onclick: move |_| open.set(true), "New Post" }

        if *open.read() {
            div { class: "overlay",
                div { class: "dialog",
                    h2 { "Create New Post" }
                    p { class: "muted", "Please fill out the details to create a new post." }

                    div { class: "fields",
                        input {
                            r#type: "text",
                            placeholder: "Title",
                            value: "{title}",
                            oninput: move |evt| title.set(evt.value()),
                        }
                        textarea {
                            placeholder: "Description",
                            value: "{description}",
                            oninput: move |evt| description.set(evt.value()),
                        }
                        input {
                            r#type: "file",
                            accept: "image/*",
                            onchange: on_file,
                        }
                    }

                    div { class: "actions",
                        button { onclick: move |_| open.set(false), "Cancel" }
                        button { class: "primary", onclick: on_create, "Create" }
                    }
                }
            }
        }
    }
}
