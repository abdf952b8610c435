//! dog-viewer - a counter, a text input and a picture of a dog.
//!
//! The dog URL is fetched in the background. Until it arrives the whole app
//! suspends and the Suspense fallback is shown instead. The demo then
//! simulates a few user interactions and prints the document after each.

use std::time::Duration;

use sprig::prelude::*;

const DOG_URL: &str = "https://images.dog.ceo/breeds/retriever-golden/n02099601_3004.jpg";

/// Stand-in for a request to the random dog image API.
async fn fetch_dog_url() -> Result<String, String> {
    tokio::time::sleep(Duration::from_millis(300)).await;
    Ok(DOG_URL.to_string())
}

fn app() -> Component {
    component("App", |cx, _| {
        let (value, set_value) = cx.use_state(String::new())?;
        let (count, set_count) = cx.use_state(0)?;
        let (dog_url, _) = cx.use_state_with(|| spawn_promise(fetch_dog_url()))?;
        let dog_url = cx.use_promise(&dog_url)?;

        let set_count_down = set_count.clone();
        let on_change = Callback::new(move |event: Value| {
            set_value.set(event.as_str().unwrap_or_default().to_string())
        });

        Ok(Descriptor::tag("div")
            .attr("className", "wrapper")
            .child(Descriptor::tag("h1").child("Hello, sprig!"))
            .child(Descriptor::tag("p").child("How're y'all doing tonight?"))
            .child(
                Descriptor::tag("form").child(
                    Descriptor::tag("label").child("Here you can write:").child(
                        Descriptor::tag("input")
                            .attr("style", "margin-inline-start: 0.5rem")
                            .attr("placeholder", "Bla, bla, bla…")
                            .attr("value", value.clone())
                            .attr("onchange", on_change),
                    ),
                ),
            )
            .child(
                Descriptor::tag("p")
                    .child(Descriptor::tag("b").child("This is what you wrote: "))
                    .child(value),
            )
            .child(
                Descriptor::tag("p")
                    .child(Descriptor::tag("b").child("Count: "))
                    .child(count),
            )
            .child(
                Descriptor::tag("div")
                    .child(
                        Descriptor::tag("button")
                            .attr("type", "button")
                            .attr("onclick", Callback::new(move |_| set_count.set(count + 1)))
                            .child("Increment"),
                    )
                    .child(
                        Descriptor::tag("button")
                            .attr("type", "button")
                            .attr(
                                "onclick",
                                Callback::new(move |_| set_count_down.set(count - 1)),
                            )
                            .child("Decrement"),
                    ),
            )
            .child(
                Descriptor::tag("p")
                    .child(Descriptor::tag("b").child("Dog URL: "))
                    .child(dog_url.clone()),
            )
            .child(
                Descriptor::tag("img")
                    .attr("style", "width: 8rem")
                    .attr("alt", "GOOD BOYYEEEEE!!")
                    .attr("src", dog_url),
            )
            .into())
    })
}

fn print_document(step: &str, root: &Root<Document>) {
    tracing::info!(step, passes = root.render_count(), "document updated");
    println!("--- {step} (pass {})", root.render_count());
    println!("{}", root.host().to_html());
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let root = create_root();
    root.render(suspense(
        Some(Descriptor::tag("span").child("Loading…").into()),
        [Descriptor::component(app()).into()],
    ))?;
    print_document("initial", &root);

    tokio::time::timeout(Duration::from_secs(5), async {
        while root.host().query("img").is_none() && root.last_error().is_none() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await?;
    if let Some(err) = root.take_error() {
        tracing::error!(%err, "dog picture failed to load");
        return Err(err.into());
    }
    print_document("dog loaded", &root);

    for _ in 0..2 {
        let increment = root
            .host()
            .query("button")
            .ok_or("increment button not rendered")?;
        dispatch(&root, increment, "onclick", Value::Null)?;
    }
    print_document("clicked increment twice", &root);

    let input = root.host().query("input").ok_or("input not rendered")?;
    dispatch(&root, input, "onchange", "Bla, bla")?;
    print_document("typed into the input", &root);

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    sprig::init_tracing();
    tokio::task::LocalSet::new().run_until(run()).await
}
