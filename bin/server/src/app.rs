//! Main Leptos application component and routing.

use crate::pages::ChatPage;
use leptos::prelude::*;
use leptos_meta::{Title, provide_meta_context};
use leptos_router::{
    components::{Route, Router, Routes},
    path,
};

/// Root component.
#[component]
pub fn App() -> impl IntoView {
    provide_meta_context();

    view! {
        <Title text="Jupiter PDF QA Agent"/>
        <Router>
            <Header/>
            <main class="container">
                <Routes fallback=|| view! { <p>"Page not found."</p> }>
                    <Route path=path!("/") view=ChatPage/>
                </Routes>
            </main>
        </Router>
    }
}

#[component]
fn Header() -> impl IntoView {
    view! {
        <header class="header">
            <h1>"🪐 Project Jupiter — PDF QA Agent"</h1>
            <p class="tagline">"Upload PDFs and ask questions about their content."</p>
        </header>
    }
}
