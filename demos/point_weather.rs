// demos/point_weather.rs
use aoiclimate::{
    get_hardiness, with_fahrenheit, AreaOfInterest, ClimateError, Frequency, HardinessOptions,
    QuerySpec, WeatherClient,
};
use chrono::NaiveDate;
use geo::point;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG=info (or debug) to see query building, usage and stage transitions.
    env_logger::init();

    // Needs OIKOLAB_API_KEY; OIKOLAB_BASE_URL optionally points elsewhere.
    let client = WeatherClient::from_env()?;

    // Two points near Oslo: above 35°N, so snow variables replace humidity/cloud cover.
    let aoi = AreaOfInterest::points(
        vec![point!(x: 10.75, y: 59.91), point!(x: 10.9, y: 59.95)],
        chrono_tz::Europe::Oslo,
    )?;
    let spec = QuerySpec::builder()
        .start(NaiveDate::from_ymd_opt(2015, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
        .end(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap().and_hms_opt(0, 0, 0).unwrap())
        .frequency(Frequency::Daily)
        .build();

    let frame = match client.get_data(&aoi, &spec) {
        Ok(frame) => frame,
        Err(ClimateError::RetrievalFailed { stage, params, source }) => {
            eprintln!("Retrieval failed while {stage} with {params:?}: {source}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    println!("Shape: {:?}", frame.frame.shape());
    println!("Local zone: {}", frame.local_timezone()?);
    println!("{}", frame.frame.tail(Some(5)));

    let with_f = with_fahrenheit(&frame, "temperature_degC", "fahrenheit")?;
    let zones = get_hardiness(&with_f, &HardinessOptions::builder().window(5).build())?;
    println!("Hardiness zones:\n{}", zones);

    Ok(())
}
