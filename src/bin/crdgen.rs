use kube_awi::crd::all_crds;

fn main() -> Result<(), serde_yaml::Error> {
    for crd in all_crds() {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
