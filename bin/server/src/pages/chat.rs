//! Chat page component and related server functions.

use crate::types::{ChatTurn, ChatView, DocumentSummary};
use leptos::form::ActionForm;
use leptos::prelude::*;

/// Loads the current session's transcript, documents and pending notice.
#[server]
pub async fn get_chat() -> Result<ChatView, ServerFnError> {
    use crate::server_helpers::{chat_view, current_session};

    let (state, session) = current_session().await.map_err(|e| {
        tracing::debug!(error = %e, "failed to load chat");
        e.into_server_error()
    })?;
    let notice = state.take_notice(session.id).await;
    Ok(chat_view(&session, notice))
}

/// Asks the agent a question and records both turns in the session.
#[server]
pub async fn ask_question(question: String) -> Result<(), ServerFnError> {
    use crate::error::ChatError;
    use crate::server_helpers::{active_session, answer_question};
    use jupiter_ai::TurnOutcome;

    let question = question.trim().to_string();
    if question.is_empty() {
        return Err(ChatError::EmptyQuestion.into_server_error());
    }

    let (state, session_id) = active_session().await.map_err(|e| e.into_server_error())?;
    let outcome = answer_question(&state, session_id, &question)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, session_id = %session_id, "failed to record answer");
            e.into_server_error()
        })?;

    match outcome {
        TurnOutcome::Answered { .. } => {
            tracing::info!(session_id = %session_id, "question answered");
        }
        TurnOutcome::Failed { error, .. } => {
            tracing::warn!(session_id = %session_id, %error, "question failed");
        }
    }
    Ok(())
}

/// Drops the chat history, keeping uploaded documents.
#[server]
pub async fn clear_conversation() -> Result<(), ServerFnError> {
    use crate::server_helpers::{active_session, change_session};
    use jupiter_conversation::Session;

    let (state, session_id) = active_session().await.map_err(|e| e.into_server_error())?;
    change_session(&state, session_id, Session::clear_conversation)
        .await
        .map_err(|e| e.into_server_error())?;
    tracing::info!(session_id = %session_id, "conversation cleared");
    Ok(())
}

/// Drops the chat history and all uploaded documents.
#[server]
pub async fn reset_session() -> Result<(), ServerFnError> {
    use crate::server_helpers::{active_session, change_session};
    use jupiter_conversation::Session;

    let (state, session_id) = active_session().await.map_err(|e| e.into_server_error())?;
    change_session(&state, session_id, Session::reset)
        .await
        .map_err(|e| e.into_server_error())?;
    tracing::info!(session_id = %session_id, "session reset");
    Ok(())
}

/// Chat page: upload sidebar plus the conversation.
#[component]
pub fn ChatPage() -> impl IntoView {
    let ask = ServerAction::<AskQuestion>::new();
    let clear = ServerAction::<ClearConversation>::new();
    let reset = ServerAction::<ResetSession>::new();

    let chat = Resource::new(
        move || (ask.version().get(), clear.version().get(), reset.version().get()),
        |_| get_chat(),
    );

    let ask_error = move || {
        ask.value()
            .get()
            .and_then(|result| result.err())
            .map(|e| view! { <p class="error">{format!("Error: {}", e)}</p> })
    };

    view! {
        <div class="chat-layout">
            <aside class="sidebar">
                <section class="sidebar-section">
                    <h2>"📄 Upload PDF"</h2>
                    <form method="post" action="/documents" enctype="multipart/form-data">
                        <input type="file" name="file" accept=".pdf,application/pdf" required=true/>
                        <button type="submit">"Upload"</button>
                    </form>
                </section>

                <Suspense fallback=move || view! { <p>"Loading..."</p> }>
                    {move || {
                        chat.get().map(|result| match result {
                            Ok(view_data) => view! {
                                <Sidebar notice=view_data.notice documents=view_data.documents/>
                            }.into_any(),
                            Err(_) => view! { <span></span> }.into_any(),
                        })
                    }}
                </Suspense>

                <section class="sidebar-section">
                    <h2>"⚙️ Session"</h2>
                    <ActionForm action=clear>
                        <button type="submit">"Clear Conversation"</button>
                    </ActionForm>
                    <ActionForm action=reset>
                        <button type="submit">"Reset Session"</button>
                    </ActionForm>
                </section>
            </aside>

            <main class="chat">
                <Suspense fallback=move || view! { <p>"Loading conversation..."</p> }>
                    {move || {
                        chat.get().map(|result| match result {
                            Ok(view_data) => view! {
                                <Transcript title=view_data.title turns=view_data.turns/>
                            }.into_any(),
                            Err(e) => view! {
                                <p class="error">{format!("Failed to load conversation: {}", e)}</p>
                            }.into_any(),
                        })
                    }}
                </Suspense>

                {move || ask.pending().get().then(|| view! { <p class="thinking">"Thinking..."</p> })}
                {ask_error}

                <ActionForm action=ask attr:class="ask-form">
                    <input
                        type="text"
                        name="question"
                        placeholder="Ask a question about your PDFs..."
                        autocomplete="off"
                    />
                    <button type="submit" disabled=move || ask.pending().get()>"Send"</button>
                </ActionForm>
            </main>
        </div>
    }
}

#[component]
fn Sidebar(notice: Option<String>, documents: Vec<DocumentSummary>) -> impl IntoView {
    view! {
        {notice.map(|text| view! { <p class="notice">{text}</p> })}
        <section class="sidebar-section">
            <h2>"📚 Uploaded Documents"</h2>
            {if documents.is_empty() {
                view! { <p class="empty">"No documents uploaded yet."</p> }.into_any()
            } else {
                view! {
                    <ul class="documents">
                        {documents.into_iter().map(|doc| view! {
                            <li>
                                <span class="document-name">{doc.name}</span>
                                <span class="document-size">{doc.size}</span>
                            </li>
                        }).collect_view()}
                    </ul>
                }.into_any()
            }}
        </section>
    }
}

#[component]
fn Transcript(title: Option<String>, turns: Vec<ChatTurn>) -> impl IntoView {
    view! {
        {title.map(|t| view! { <h2 class="chat-title">{t}</h2> })}
        {if turns.is_empty() {
            view! {
                <p class="empty">"Upload a PDF and ask a question about it."</p>
            }.into_any()
        } else {
            view! {
                <div class="turns">
                    {turns.into_iter().map(|turn| {
                        let class = format!("turn turn-{}", turn.role);
                        view! {
                            <div class=class>
                                <span class="turn-role">{turn.role}</span>
                                <p class="turn-content">{turn.content}</p>
                            </div>
                        }
                    }).collect_view()}
                </div>
            }.into_any()
        }}
    }
}
