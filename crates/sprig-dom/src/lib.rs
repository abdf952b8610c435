//! In-memory document host for sprig.
//!
//! [`Document`] implements [`sprig_core::Host`] over an arena of element and
//! text nodes. Rendered output can be serialized with
//! [`Document::to_html`], and handlers set as `Callback` properties can be
//! fired with [`dispatch`].

pub mod document;
pub mod events;
pub mod html;

pub use document::{Document, DomError, ElementData, NodeData, NodeId};
pub use events::{EventHandlerId, EventRegistry};
pub use html::html_escape_string;

use sprig_core::{Root, RenderError, Value};

/// Fire the `event` handler registered on `node`.
///
/// Returns `Ok(false)` when no handler is registered. The handler runs
/// after the document borrow is released, so state updates it performs
/// re-render `root` synchronously. Must not be called from inside a render
/// pass of `root`.
pub fn dispatch(
    root: &Root<Document>,
    node: NodeId,
    event: &str,
    payload: impl Into<Value>,
) -> Result<bool, RenderError> {
    let Some(handler) = root.with_host(|doc| doc.handler(node, event)) else {
        tracing::debug!(?node, event, "no handler registered");
        return Ok(false);
    };
    tracing::debug!(?node, event, "dispatching event");
    handler.invoke(payload.into())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprig_core::{
        Callback, Descriptor, Kind, Node, Promise, Props, component, create_container,
        create_element,
    };

    #[test]
    fn click_updates_counter() {
        let counter = component("Counter", |cx, _| {
            let (count, set_count) = cx.use_state(0)?;
            let increment = Callback::new(move |_| set_count.set(count + 1));
            Ok(Descriptor::tag("div")
                .child(Descriptor::tag("span").child(count))
                .child(
                    Descriptor::tag("button")
                        .attr("onClick", increment)
                        .child("+1"),
                )
                .into())
        });

        let root = create_container(Document::new());
        root.render(Descriptor::component(counter)).unwrap();
        assert_eq!(
            root.host().to_html(),
            "<div><span>0</span><button>+1</button></div>"
        );

        for _ in 0..2 {
            // Node ids are recycled on each rebuild, so look the button up again.
            let button = root.host().query("button").unwrap();
            assert!(dispatch(&root, button, "onClick", Value::Null).unwrap());
        }
        assert_eq!(root.render_count(), 3);
        let span = root.host().query("span").unwrap();
        assert_eq!(root.host().text_content(span), "2");
    }

    #[test]
    fn change_events_carry_their_payload() {
        let form = component("Form", |cx, _| {
            let (value, set_value) = cx.use_state(String::new())?;
            let on_change = Callback::new(move |payload: Value| {
                set_value.set(payload.as_str().unwrap_or_default().to_string())
            });
            Ok(Node::from(vec![
                Descriptor::tag("input")
                    .attr("value", value.clone())
                    .attr("onChange", on_change)
                    .into(),
                Descriptor::tag("p").child(value).into(),
            ]))
        });

        let root = create_container(Document::new());
        root.render(Descriptor::component(form)).unwrap();

        let input = root.host().query("input").unwrap();
        dispatch(&root, input, "onChange", "beagle").unwrap();
        assert_eq!(
            root.host().to_html(),
            "<input value=\"beagle\"><p>beagle</p>"
        );
    }

    #[test]
    fn missing_handler_is_reported() {
        let root = create_container(Document::new());
        root.render(Descriptor::tag("button").child("idle")).unwrap();

        let button = root.host().query("button").unwrap();
        assert!(!dispatch(&root, button, "onClick", Value::Null).unwrap());
        assert_eq!(root.render_count(), 1);
    }

    #[test]
    fn rebuilds_drop_stale_handlers() {
        let root = create_container(Document::new());
        let noisy = Descriptor::tag("button").attr("onClick", Callback::new(|_| Ok(())));
        root.render(noisy).unwrap();
        assert_eq!(root.host().handler_count(), 1);

        root.render(Descriptor::tag("p")).unwrap();
        assert_eq!(root.host().handler_count(), 0);
    }

    #[test]
    fn text_fallback_shows_while_suspended() {
        let (promise, resolver) = Promise::<String>::new();
        let reader = component("Reader", move |cx, _| {
            Ok(Descriptor::tag("p").child(cx.use_promise(&promise)?).into())
        });
        let tree = create_element(
            Kind::Suspense,
            Props::new().with("fallback", "Loading…"),
            [Descriptor::component(reader).into()],
        );

        let root = create_container(Document::new());
        root.render(tree).unwrap();
        assert_eq!(root.host().to_html(), "Loading…");

        resolver.resolve("done".to_string());
        assert_eq!(root.host().to_html(), "<p>done</p>");
    }
}
